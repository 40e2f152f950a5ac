use std::sync::Arc;
use std::time::Duration;

use crate::ws::hub::SubscriptionHub;

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients.
///
/// Pings double as liveness probes: a subscription whose channel has closed
/// is removed by the ping that finds it. Abort the returned handle to stop.
pub fn start_heartbeat(hub: Arc<SubscriptionHub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            let delivered = hub.ping_all();
            tracing::debug!(count = delivered, "WebSocket heartbeat ping");
        }
    })
}
