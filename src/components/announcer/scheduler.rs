use super::Announcer;
use crate::utils::time::TICK_PERIOD_SECS;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::info;

/// Start the announcement scheduler: one tick per period, forever. Tick
/// failures are contained inside `run_tick`, so the loop never exits.
pub async fn start_scheduler(announcer: Arc<RwLock<Announcer>>) {
    info!(
        "Announcement scheduler started, ticking every {}s",
        TICK_PERIOD_SECS
    );
    tokio::spawn(async move {
        loop {
            sleep(TokioDuration::from_secs(TICK_PERIOD_SECS as u64)).await;
            let now = Utc::now();
            announcer.write().await.run_tick(now).await;
        }
    });
}
