//! Expiry Sweep Task
//!
//! Background task that periodically removes keys whose physical TTL has
//! run out, so memory is reclaimed even for keys nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::MemoryBackend;

/// Spawns a background task that purges expired keys from `backend` every
/// `sweep_interval_secs` seconds.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let backend = Arc::new(MemoryBackend::new(16));
/// let sweeper = spawn_sweeper_task(backend.clone(), 1);
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper_task(backend: Arc<MemoryBackend>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = backend.purge_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} expired keys", removed);
            } else {
                debug!("Expiry sweep: no expired keys found");
            }
        }
    })
}
