//! Periodic kitchen temperature logging while a bake is open

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::BakeSession;

/// Spawn the background task that logs the kitchen temperature every `every`
///
/// The first reading is taken one full interval after startup.
pub fn spawn_auto_logger(session: Arc<BakeSession>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() completes its first tick immediately
        ticker.tick().await;

        tracing::info!(interval_secs = every.as_secs(), "temperature auto-logging enabled");
        loop {
            ticker.tick().await;
            match session.auto_log_tick().await {
                Ok(Some(event)) => {
                    tracing::info!(temp = ?event.ambient_temp_f, "auto-logged kitchen temperature")
                }
                Ok(None) => tracing::debug!("auto-log skipped: no bake in progress or no reading"),
                Err(e) => tracing::warn!(error = %e, "auto-log failed"),
            }
        }
    })
}
