//! Periodic removal of expired job records.
//!
//! Reads already treat expired records as absent; this loop reclaims their
//! memory even when no new jobs arrive.

use std::sync::Arc;
use std::time::Duration;

use faceswap_store::JobStore;
use tokio_util::sync::CancellationToken;

/// Run the expiry sweep every `interval` until `cancel` is triggered.
pub async fn run(store: Arc<JobStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        ttl_secs = store.ttl().as_secs(),
        interval_secs = interval.as_secs(),
        "Job expiry sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job expiry sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let removed = store.sweep_expired();
                if removed > 0 {
                    tracing::info!(removed, remaining = store.len(), "Expired jobs purged");
                } else {
                    tracing::debug!("Job expiry: nothing to purge");
                }
            }
        }
    }
}
