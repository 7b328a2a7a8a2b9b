//! Periodic hold-timer enforcement.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{CancellationStatus, OfferBatchDispatcher, SlotLedger};

/// Expires overdue pending offers on a fixed interval and advances any slot
/// whose batch is now fully resolved.
///
/// Explicitly constructed with its dependencies and started by the binary.
/// Each cycle is idempotent and safe to run alongside the resolvers: the
/// dispatcher re-checks batch state under the slot lock, so a redundant
/// advance is a cheap no-op.
pub struct HoldTimerSweeper {
    ledger: Arc<SlotLedger>,
    dispatcher: Arc<OfferBatchDispatcher>,
    interval: Duration,
    is_shutdown: RwLock<bool>,
}

impl HoldTimerSweeper {
    pub fn new(
        ledger: Arc<SlotLedger>,
        dispatcher: Arc<OfferBatchDispatcher>,
        interval_seconds: u64,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            interval: Duration::from_secs(interval_seconds),
            is_shutdown: RwLock::new(false),
        }
    }

    pub async fn start(&self) {
        info!("Starting hold timer sweeper (every {}s)", self.interval.as_secs());
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; skip it so startup stays quiet
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if *self.is_shutdown.read().await {
                break;
            }
            let advanced = self.sweep(Utc::now()).await;
            if advanced > 0 {
                info!("Expired-hold sweep sent {} new batch(es)", advanced);
            }
        }

        debug!("Hold timer sweeper stopped");
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }

    /// One sweep pass. Returns how many slots advanced to a new batch.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let expired = self.ledger.expire_overdue(now).await;
        if expired.is_empty() {
            return 0;
        }
        for offer in &expired {
            info!("Offer {} expired", offer.id);
        }

        let slot_ids: HashSet<Uuid> = expired.iter().map(|o| o.slot_id).collect();
        let mut advanced = 0;

        for slot_id in slot_ids {
            let Some(slot) = self.ledger.get_slot(slot_id).await else {
                continue;
            };
            if slot.status != CancellationStatus::Open {
                continue;
            }

            let offers = self.ledger.offers_for_slot(slot_id).await;
            let Some(current_batch) = offers.iter().map(|o| o.batch_number).max() else {
                continue;
            };
            let all_resolved = offers
                .iter()
                .filter(|o| o.batch_number == current_batch)
                .all(|o| o.state.is_terminal());
            if !all_resolved {
                continue;
            }

            // A failed slot must not stall the rest of the sweep
            match self.dispatcher.dispatch_at(slot_id, now).await {
                Ok(sent) if sent > 0 => advanced += 1,
                Ok(_) => {}
                Err(e) => error!("Sweep failed to advance slot {}: {}", slot_id, e),
            }
        }

        advanced
    }
}
