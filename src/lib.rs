//! Tiered Cache - A two-tier (memory + disk) cache for loader-derived values
//!
//! Records are keyed by provider key, dynamic key and dynamic key group,
//! expire against the life time of each read, and are evicted from disk
//! when persistence nears its size limit.

pub mod cache;
pub mod config;
pub mod error;
pub mod persistence;
pub mod providers;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use cache::{Record, Source, TwoLayersCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use persistence::{Disk, Persistence};
pub use providers::{CacheRequest, EvictPolicy, ProcessorProviders, Reply};
