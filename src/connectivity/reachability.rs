//! Periodic reachability check feeding a [`ConnectivityMonitor`].

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::ConnectivityMonitor;

const ENABLE_LOGS: bool = false;

use crate::{log_debug, log_info};

/// Request `url` every `interval` until `cancel_token` fires. Any HTTP response
/// counts as reachable; a transport error or timeout counts as unreachable.
pub async fn watch_reachability(
    monitor: ConnectivityMonitor,
    http: reqwest::Client,
    url: String,
    interval: Duration,
    timeout: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let reachable = check_reachable(&http, &url, timeout).await;
                log_debug!("reachability check: {}", reachable);
                monitor.report(reachable);
            }
            _ = cancel_token.cancelled() => {
                log_info!("reachability check shutting down");
                break;
            }
        }
    }
}

pub async fn check_reachable(http: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, http.get(url).send()).await,
        Ok(Ok(_))
    )
}
