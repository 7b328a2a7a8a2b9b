//! Batch dispatch: who gets offered a slot next, and when a slot gives up.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use messaging_cell::{templates, MessageLog, MessageStatus, NotificationChannel};
use shared_config::AppConfig;
use waitlist_cell::PatientDirectory;

use crate::{
    CancellationSlot, CancellationStatus, EligibilityFilter, Offer, OfferError, OfferState,
    SlotLedger,
};

const FALLBACK_PROVIDER_NAME: &str = "our clinic";

pub struct OfferBatchDispatcher {
    ledger: Arc<SlotLedger>,
    directory: Arc<PatientDirectory>,
    eligibility: EligibilityFilter,
    channel: Arc<dyn NotificationChannel>,
    messages: Arc<MessageLog>,
    batch_size: usize,
    hold_minutes: i64,
    from_number: String,
}

impl OfferBatchDispatcher {
    pub fn new(
        ledger: Arc<SlotLedger>,
        directory: Arc<PatientDirectory>,
        channel: Arc<dyn NotificationChannel>,
        messages: Arc<MessageLog>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ledger,
            eligibility: EligibilityFilter::new(directory.clone()),
            directory,
            channel,
            messages,
            batch_size: config.batch_size,
            hold_minutes: config.hold_minutes,
            from_number: config.twilio_from_number.clone(),
        }
    }

    /// Send the next batch of offers for a slot. Returns the number of
    /// offers that actually went out.
    pub async fn dispatch(&self, slot_id: Uuid) -> Result<usize, OfferError> {
        self.dispatch_at(slot_id, Utc::now()).await
    }

    /// Clock-injected variant of [`dispatch`](Self::dispatch).
    ///
    /// Runs entirely under the slot's exclusive lock, so a decline-triggered
    /// advance and a sweep-triggered advance for the same slot serialize
    /// here: whichever arrives second observes the fresh batch still in
    /// flight and returns 0 without creating anything.
    #[instrument(skip(self, now), fields(slot_id = %slot_id))]
    pub async fn dispatch_at(&self, slot_id: Uuid, now: DateTime<Utc>) -> Result<usize, OfferError> {
        let _slot_guard = self.ledger.lock_slot(slot_id).await?;

        let slot = self
            .ledger
            .get_slot(slot_id)
            .await
            .ok_or_else(|| OfferError::NotFound(format!("slot {}", slot_id)))?;
        if slot.status != CancellationStatus::Open {
            warn!("Slot {} is not open (status {:?}), nothing to dispatch", slot_id, slot.status);
            return Ok(0);
        }

        let provider_name = self.provider_display_name(&slot).await;
        let hold_expires_at = now + Duration::minutes(self.hold_minutes);

        // Loops only when an entire batch fails to send; otherwise one pass
        loop {
            let existing = self.ledger.offers_for_slot(slot_id).await;
            let current_batch = existing.iter().map(|o| o.batch_number).max();
            if let Some(batch) = current_batch {
                let in_flight = existing
                    .iter()
                    .any(|o| o.batch_number == batch && !o.state.is_terminal());
                if in_flight {
                    debug!("Batch {} for slot {} still in flight, not advancing", batch, slot_id);
                    return Ok(0);
                }
            }
            let next_batch = current_batch.unwrap_or(0) + 1;

            let already_offered: HashSet<Uuid> = existing.iter().map(|o| o.patient_id).collect();
            let candidates = self
                .eligibility
                .next_batch(&slot, &already_offered, self.batch_size)
                .await;

            if candidates.is_empty() {
                info!("No more eligible patients for slot {}, marking expired", slot_id);
                self.ledger
                    .transition_slot(slot_id, CancellationStatus::Expired)
                    .await?;
                return Ok(0);
            }

            info!(
                "Sending batch {} ({} offers) for slot {}",
                next_batch,
                candidates.len(),
                slot_id
            );

            let mut sent = 0;

            for entry in candidates {
                let Some(patient) = self.directory.get_patient(entry.patient_id).await else {
                    continue;
                };

                let offer = self
                    .ledger
                    .insert_offer(Offer::new(
                        slot_id,
                        patient.id,
                        next_batch,
                        now,
                        hold_expires_at,
                    ))
                    .await?;

                let body = templates::initial_offer(
                    slot.slot_start_at,
                    &slot.location,
                    &provider_name,
                    self.hold_minutes,
                );

                match self.channel.send(&patient.phone, &body).await {
                    Ok(sid) => {
                        self.messages
                            .record_outbound(
                                Some(offer.id),
                                &self.from_number,
                                &patient.phone,
                                &body,
                                Some(sid),
                                MessageStatus::Sent,
                                None,
                                now,
                            )
                            .await;
                        self.directory.touch_last_contacted(patient.id, now).await;
                        sent += 1;
                        info!("Offer {} sent to patient {} ({})", offer.id, patient.id, patient.phone);
                    }
                    Err(e) => {
                        // One dead number must not sink the rest of the batch
                        error!("Failed to send offer to patient {}: {}", patient.id, e);
                        self.ledger
                            .transition_offer(offer.id, OfferState::Failed, now)
                            .await?;
                        self.messages
                            .record_outbound(
                                Some(offer.id),
                                &self.from_number,
                                &patient.phone,
                                &body,
                                None,
                                MessageStatus::Failed,
                                Some(e.to_string()),
                                now,
                            )
                            .await;
                    }
                }
            }

            if sent > 0 {
                return Ok(sent);
            }
            // Every send in this batch failed; nothing is pending, so no
            // timer will ever fire for it. Move straight to the next batch.
            warn!(
                "Every send in batch {} failed for slot {}, trying the next batch",
                next_batch, slot_id
            );
        }
    }

    /// Staff void: close the slot and release everyone still waiting on it.
    pub async fn abort(&self, slot_id: Uuid) -> Result<CancellationSlot, OfferError> {
        self.abort_at(slot_id, Utc::now()).await
    }

    pub async fn abort_at(
        &self,
        slot_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CancellationSlot, OfferError> {
        let guard = self.ledger.lock_slot(slot_id).await?;

        let slot = self
            .ledger
            .transition_slot(slot_id, CancellationStatus::Aborted)
            .await?;

        let pending: Vec<Offer> = self
            .ledger
            .offers_for_slot(slot_id)
            .await
            .into_iter()
            .filter(|o| o.state == OfferState::Pending)
            .collect();
        for offer in &pending {
            // The sweeper may have expired one of them first
            if let Err(e) = self
                .ledger
                .transition_offer(offer.id, OfferState::Canceled, now)
                .await
            {
                debug!("Offer {} already resolved: {}", offer.id, e);
            }
        }
        drop(guard);

        info!("Slot {} aborted by staff, {} pending offer(s) canceled", slot_id, pending.len());

        for offer in pending {
            if let Some(patient) = self.directory.get_patient(offer.patient_id).await {
                let body = templates::slot_filled_notice();
                self.notify_best_effort(offer.id, &patient.phone, &body, now).await;
            }
        }

        Ok(slot)
    }

    pub(crate) async fn provider_display_name(&self, slot: &CancellationSlot) -> String {
        match slot.provider_id {
            Some(id) => self
                .directory
                .get_provider(id)
                .await
                .map(|p| p.name)
                .unwrap_or_else(|| FALLBACK_PROVIDER_NAME.to_string()),
            None => FALLBACK_PROVIDER_NAME.to_string(),
        }
    }

    async fn notify_best_effort(
        &self,
        offer_id: Uuid,
        to: &str,
        body: &str,
        now: DateTime<Utc>,
    ) {
        match self.channel.send(to, body).await {
            Ok(sid) => {
                self.messages
                    .record_outbound(
                        Some(offer_id),
                        &self.from_number,
                        to,
                        body,
                        Some(sid),
                        MessageStatus::Sent,
                        None,
                        now,
                    )
                    .await;
            }
            Err(e) => {
                error!("Failed to send notification to {}: {}", to, e);
                self.messages
                    .record_outbound(
                        Some(offer_id),
                        &self.from_number,
                        to,
                        body,
                        None,
                        MessageStatus::Failed,
                        Some(e.to_string()),
                        now,
                    )
                    .await;
            }
        }
    }
}
