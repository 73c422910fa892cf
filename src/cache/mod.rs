//! Cache Module
//!
//! Provides the two-tier record cache: composite keys, records, the memory
//! tier and the retrieve, save and evict engines behind one facade.

mod evict;
pub mod key;
mod memory;
mod record;
mod retrieve;
mod save;
mod two_layer;


// Re-export public types
pub use evict::EvictRecord;
pub use key::{compose, DYNAMIC_KEY_SEPARATOR, GROUP_SEPARATOR};
pub use memory::MemoryTier;
pub use record::{current_timestamp_ms, PayloadKind, Record, Source, StoredRecord, ValueKind};
pub use retrieve::RetrieveRecord;
pub use save::SaveRecord;
pub use two_layer::TwoLayersCache;
