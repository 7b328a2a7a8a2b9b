use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::services::prioritizer::refresh_all_scores;
use crate::PatientDirectory;

/// Periodic job that keeps cached priority scores current as entries age.
///
/// Constructed explicitly with its dependencies and started by the binary;
/// a failed cycle is logged and the next one proceeds.
pub struct ScoreRecalcService {
    directory: Arc<PatientDirectory>,
    interval: Duration,
    is_shutdown: RwLock<bool>,
}

impl ScoreRecalcService {
    pub fn new(directory: Arc<PatientDirectory>, interval_minutes: u64) -> Self {
        Self {
            directory,
            interval: Duration::from_secs(interval_minutes * 60),
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn start(&self) {
        info!(
            "Starting priority recalculation job (every {}s)",
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if *self.is_shutdown.read().await {
                break;
            }
            let count = refresh_all_scores(&self.directory, Utc::now()).await;
            if count > 0 {
                info!("Priority recalculation: updated {} entries", count);
            } else {
                debug!("Priority recalculation: nothing to update");
            }
        }

        debug!("Priority recalculation job stopped");
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }

    /// One recalculation pass, for callers that do not want the loop.
    pub async fn run_once(&self) -> usize {
        refresh_all_scores(&self.directory, Utc::now()).await
    }
}
