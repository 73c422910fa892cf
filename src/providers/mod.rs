//! Providers Module
//!
//! Loader orchestration on top of the two-tier cache: requests, replies and
//! the processor that decides between cached and freshly loaded data.

mod processor;
mod reply;
mod request;

pub use processor::ProcessorProviders;
pub use reply::Reply;
pub use request::{CacheRequest, EvictPolicy};
