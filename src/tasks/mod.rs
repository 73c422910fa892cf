//! Background Tasks Module
//!
//! Contains the background processes that maintain the persistence tier.
//!
//! # Tasks
//! - Expired sweep: removes elapsed records once, before the cache serves
//! - Size eviction: removes expirable records when persistence nears its limit

mod expired_sweep;
mod size_evictor;

pub use expired_sweep::{evict_expired_records, spawn_expired_sweep, StartupBarrier};
pub use size_evictor::{
    SizeEvictor, SweepHandle, SweepOutcome, START_PERCENTAGE, STOP_PERCENTAGE,
};
