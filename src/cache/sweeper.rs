//! Timer-driven eviction of expired cache entries

use crate::cache::store::CacheStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Periodic expiry sweep over a shared [`CacheStore`]
///
/// The sweeper is the only autonomous component; everything else runs
/// synchronously inside request handling. Each sweep is a single atomic
/// eviction pass, so stopping between cycles never leaves a pass
/// half-applied. Running two sweeps back to back is harmless: the second
/// finds nothing left to evict.
pub struct ExpirySweeper {
    store: Arc<CacheStore>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Create a sweeper over the given store
    pub fn new(store: Arc<CacheStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Run one sweep pass; safe to call at any time
    pub fn run_once(&self) -> usize {
        let evicted = self.store.evict_expired();
        if evicted > 0 {
            info!("Expiry sweep evicted {} entries", evicted);
        }
        evicted
    }

    /// Spawn the periodic sweep loop on the current tokio runtime
    pub fn start(self) -> SweeperHandle {
        info!("Starting expiry sweeper (interval: {:?})", self.interval);

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // an interval's first tick completes immediately; skip it
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once();
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("Expiry sweeper stopping");
                        break;
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle for stopping a running sweeper cleanly
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal shutdown and wait for the sweep loop to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!("Expiry sweeper task ended abnormally: {}", e);
        }
    }
}
