//! Background tasks for the formvox server.
//!
//! Includes:
//! - Expiring sessions the browser abandoned.

use crate::sessions::SessionRegistry;
use tokio::time::{sleep, Duration};

/// Starts the idle session sweep.
///
/// Runs indefinitely. A session whose host has sent no event for
/// `idle_timeout_secs` is removed along with its turn timer; its SSE
/// subscribers see the stream end.
pub async fn start_session_sweep_task(sessions: SessionRegistry, idle_timeout_secs: u64) {
    if idle_timeout_secs == 0 {
        tracing::warn!("session sweep disabled (idle_timeout=0)");
        return;
    }

    let idle = Duration::from_secs(idle_timeout_secs);
    let interval_seconds = (idle_timeout_secs / 2).clamp(1, 60);
    let interval = Duration::from_secs(interval_seconds);

    tracing::info!(
        idle_timeout_secs,
        interval_seconds,
        "starting idle session sweep"
    );

    loop {
        sleep(interval).await;

        let expired = sessions.prune_idle(idle);
        if expired > 0 {
            tracing::info!(
                count = expired,
                remaining = sessions.len(),
                "expired idle sessions"
            );
        }
    }
}
