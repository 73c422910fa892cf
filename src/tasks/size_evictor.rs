//! Size-Threshold Evictor
//!
//! Background task that bulk-evicts expirable records from persistence once
//! it grows past the start threshold, until it drops under the stop
//! threshold.
//!
//! The evictor is a two-state machine. While armed, each trigger runs a
//! sweep; a sweep that walks every key without getting under the stop
//! threshold proves there is nothing left worth evicting and the evictor
//! goes idle. Idle triggers return [`SweepOutcome::NoExpirableRecords`]
//! without scanning. Triggers arriving while a sweep is in flight share
//! that sweep's handle.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::cache::EvictRecord;
use crate::persistence::Persistence;

/// Persistence usage, in percent of the maximum, that starts a sweep.
pub const START_PERCENTAGE: u64 = 95;

/// Persistence usage, in percent of the maximum, that ends a sweep.
pub const STOP_PERCENTAGE: u64 = 70;

// == Sweep Outcome ==
/// What one trigger of the evictor did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SweepOutcome {
    /// Persistence was under the start threshold; nothing scanned
    BelowStartThreshold,
    /// Usage was brought down to the stop threshold
    ReachedStopThreshold { evicted: usize, released_mb: f64 },
    /// Every key was visited without reaching the stop threshold
    Exhausted { evicted: usize, released_mb: f64 },
    /// The evictor is idle: an earlier sweep found no expirable records left
    NoExpirableRecords,
    /// The sweep task died before finishing
    Interrupted,
}

/// Cloneable handle on a running or completed sweep.
pub type SweepHandle = Shared<BoxFuture<'static, SweepOutcome>>;

#[derive(Default)]
struct EvictorState {
    idle: bool,
    in_flight: Option<SweepHandle>,
}

struct Inner {
    persistence: Arc<dyn Persistence>,
    evict: EvictRecord,
    max_mb: u64,
    encrypt_key: Option<String>,
    state: Mutex<EvictorState>,
}

// == Size Evictor ==
/// Single-flight, hysteresis-driven evictor of expirable records.
#[derive(Clone)]
pub struct SizeEvictor {
    inner: Arc<Inner>,
}

/// Clears the in-flight slot even if the sweep task unwinds.
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.state.lock().in_flight = None;
    }
}

impl SizeEvictor {
    /// Creates an armed evictor bounded by `max_mb` of persistence.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        evict: EvictRecord,
        max_mb: u64,
        encrypt_key: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                persistence,
                evict,
                max_mb,
                encrypt_key,
                state: Mutex::new(EvictorState::default()),
            }),
        }
    }

    // == Start If Needed ==
    /// Runs a sweep in the background unless one is in flight or the
    /// evictor is idle. Must be called within a tokio runtime.
    ///
    /// The returned handle may be dropped; the sweep runs to completion
    /// regardless.
    pub fn start_if_needed(&self, encrypted: bool) -> SweepHandle {
        let mut state = self.inner.state.lock();

        if let Some(handle) = &state.in_flight {
            return handle.clone();
        }

        if state.idle {
            warn!("Records can not be evicted because no one is expirable");
            return futures::future::ready(SweepOutcome::NoExpirableRecords)
                .boxed()
                .shared();
        }

        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _guard = InFlightGuard(inner.clone());
            let outcome = inner.sweep(encrypted).await;
            if matches!(outcome, SweepOutcome::Exhausted { .. }) {
                inner.state.lock().idle = true;
            }
            outcome
        });

        let handle = async move {
            task.await.unwrap_or_else(|e| {
                error!("Size eviction task failed: {}", e);
                SweepOutcome::Interrupted
            })
        }
        .boxed()
        .shared();

        state.in_flight = Some(handle.clone());
        handle
    }

    /// True once a sweep found nothing more to evict.
    pub fn is_idle(&self) -> bool {
        self.inner.state.lock().idle
    }
}

impl Inner {
    fn threshold_mb(&self, percentage: u64) -> f64 {
        self.max_mb as f64 * percentage as f64 / 100.0
    }

    async fn sweep(&self, encrypted: bool) -> SweepOutcome {
        let stored_mb = self.persistence.stored_mb().await as f64;
        if stored_mb < self.threshold_mb(START_PERCENTAGE) {
            return SweepOutcome::BelowStartThreshold;
        }

        let stop_mb = self.threshold_mb(STOP_PERCENTAGE);
        info!(
            "Persistence at {} MB of {} MB, evicting expirable records",
            stored_mb, self.max_mb
        );

        let mut released_mb = 0.0;
        let mut evicted = 0;
        let mut reached_stop = false;

        for key in self.persistence.all_keys().await {
            let record = match self
                .persistence
                .retrieve_record(&key, encrypted, self.encrypt_key.as_deref())
                .await
            {
                Some(record) => record,
                None => continue,
            };
            if !record.is_expirable() {
                continue;
            }

            self.evict.evict_key(&key).await;
            released_mb += record.size_on_disk_mb();
            evicted += 1;

            if stored_mb - released_mb <= stop_mb {
                reached_stop = true;
                break;
            }
        }

        info!(
            "Size eviction released {:.2} MB across {} records",
            released_mb, evicted
        );

        if reached_stop {
            SweepOutcome::ReachedStopThreshold {
                evicted,
                released_mb,
            }
        } else {
            SweepOutcome::Exhausted {
                evicted,
                released_mb,
            }
        }
    }
}
