//! Decline handling, including the early advance to the next batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use messaging_cell::templates;
use waitlist_cell::PatientDirectory;

use crate::{CancellationStatus, OfferBatchDispatcher, OfferError, OfferState, SlotLedger};

pub struct DeclineResolver {
    ledger: Arc<SlotLedger>,
    directory: Arc<PatientDirectory>,
    dispatcher: Arc<OfferBatchDispatcher>,
}

impl DeclineResolver {
    pub fn new(
        ledger: Arc<SlotLedger>,
        directory: Arc<PatientDirectory>,
        dispatcher: Arc<OfferBatchDispatcher>,
    ) -> Self {
        Self {
            ledger,
            directory,
            dispatcher,
        }
    }

    /// Handle a NO reply from `phone`. Always returns an acknowledgment;
    /// an unknown number or a reply with nothing pending is not an error.
    pub async fn decline(&self, phone: &str) -> Result<String, OfferError> {
        self.decline_at(phone, Utc::now()).await
    }

    /// Clock-injected variant of [`decline`](Self::decline). When the
    /// decline resolves the last open offer of the current batch, the next
    /// batch goes out immediately instead of waiting for the hold timer.
    #[instrument(skip(self, now), fields(phone = %phone))]
    pub async fn decline_at(&self, phone: &str, now: DateTime<Utc>) -> Result<String, OfferError> {
        let reply = templates::decline_ack();

        let Some(patient) = self.directory.find_by_phone(phone).await else {
            return Ok(reply);
        };
        let Some(offer) = self.ledger.latest_pending_offer_for_patient(patient.id).await else {
            return Ok(reply);
        };

        // The sweeper may have expired the offer first; the ack still stands
        if let Err(e) = self
            .ledger
            .transition_offer(offer.id, OfferState::Declined, now)
            .await
        {
            debug!("Offer {} was already resolved: {}", offer.id, e);
            return Ok(reply);
        }
        info!("Patient {} declined offer {}", patient.id, offer.id);

        self.advance_if_batch_resolved(offer.slot_id, now).await;

        Ok(reply)
    }

    /// Fire the next batch when the current one is fully resolved. The
    /// dispatcher re-checks under the slot lock, so racing the sweeper here
    /// produces at most one new batch.
    async fn advance_if_batch_resolved(&self, slot_id: Uuid, now: DateTime<Utc>) {
        let Some(slot) = self.ledger.get_slot(slot_id).await else {
            return;
        };
        if slot.status != CancellationStatus::Open {
            return;
        }

        let offers = self.ledger.offers_for_slot(slot_id).await;
        let Some(current_batch) = offers.iter().map(|o| o.batch_number).max() else {
            return;
        };
        let all_resolved = offers
            .iter()
            .filter(|o| o.batch_number == current_batch)
            .all(|o| o.state.is_terminal());
        if !all_resolved {
            return;
        }

        info!(
            "All offers in batch {} resolved for slot {}, sending next batch immediately",
            current_batch, slot_id
        );
        match self.dispatcher.dispatch_at(slot_id, now).await {
            Ok(sent) if sent > 0 => info!("Sent {} offer(s) in next batch", sent),
            Ok(_) => {}
            Err(e) => error!("Failed to advance batch for slot {}: {}", slot_id, e),
        }
    }
}
