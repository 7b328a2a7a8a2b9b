//! Race-safe claim handling for inbound YES replies.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use messaging_cell::{templates, MessageLog, MessageStatus, NotificationChannel};
use shared_config::AppConfig;
use waitlist_cell::PatientDirectory;

use crate::{CancellationSlot, CancellationStatus, OfferError, OfferState, SlotLedger};

const FALLBACK_PROVIDER_NAME: &str = "our clinic";

/// What a claim attempt came to. Only `Claimed` fills the slot; the rest are
/// defined negative outcomes, not errors.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed { slot: CancellationSlot },
    TooLate,
    Expired,
    NoActiveOffer,
}

impl ClaimOutcome {
    pub fn claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed { .. })
    }
}

pub struct AcceptanceResolver {
    ledger: Arc<SlotLedger>,
    directory: Arc<PatientDirectory>,
    channel: Arc<dyn NotificationChannel>,
    messages: Arc<MessageLog>,
    from_number: String,
}

impl AcceptanceResolver {
    pub fn new(
        ledger: Arc<SlotLedger>,
        directory: Arc<PatientDirectory>,
        channel: Arc<dyn NotificationChannel>,
        messages: Arc<MessageLog>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ledger,
            directory,
            channel,
            messages,
            from_number: config.twilio_from_number.clone(),
        }
    }

    /// Handle a YES reply from `phone`. Returns the outcome and the reply
    /// text already sent (or chosen) for the patient.
    pub async fn accept(&self, phone: &str) -> Result<(ClaimOutcome, String), OfferError> {
        self.accept_at(phone, Utc::now()).await
    }

    /// Clock-injected variant of [`accept`](Self::accept).
    ///
    /// The hold-expiry check runs before the slot lock is taken, so an
    /// overdue offer can never be accepted even when the sweeper is behind.
    /// Offer and slot are re-read under the lock; only the claimant that
    /// still observes a pending offer on an open slot wins.
    #[instrument(skip(self, now), fields(phone = %phone))]
    pub async fn accept_at(
        &self,
        phone: &str,
        now: DateTime<Utc>,
    ) -> Result<(ClaimOutcome, String), OfferError> {
        let patient = self
            .directory
            .find_by_phone(phone)
            .await
            .ok_or_else(|| OfferError::NotFound(format!("patient with phone {}", phone)))?;

        let Some(offer) = self.ledger.latest_pending_offer_for_patient(patient.id).await else {
            warn!("No pending offer found for patient {}", patient.id);
            return Ok((ClaimOutcome::NoActiveOffer, templates::unrecognized_guidance()));
        };

        if now > offer.hold_expires_at {
            info!("Offer {} expired for patient {}", offer.id, patient.id);
            // The sweeper may have expired it in the meantime; same outcome
            if let Err(e) = self
                .ledger
                .transition_offer(offer.id, OfferState::Expired, now)
                .await
            {
                debug!("Offer {} already resolved: {}", offer.id, e);
            }
            let reply = templates::too_late_notice();
            self.send_and_log(offer.id, &patient.phone, &reply, now).await;
            return Ok((ClaimOutcome::Expired, reply));
        }

        let guard = self.ledger.lock_slot(offer.slot_id).await?;

        // Re-read under the lock; a sibling may have won while we waited
        let offer = self
            .ledger
            .get_offer(offer.id)
            .await
            .ok_or_else(|| OfferError::NotFound(format!("offer {}", offer.id)))?;
        if offer.state != OfferState::Pending {
            drop(guard);
            info!("Offer {} resolved to {:?} before claim completed", offer.id, offer.state);
            let reply = templates::too_late_notice();
            self.send_and_log(offer.id, &patient.phone, &reply, now).await;
            return Ok((ClaimOutcome::TooLate, reply));
        }

        let slot = self
            .ledger
            .get_slot(offer.slot_id)
            .await
            .ok_or_else(|| OfferError::NotFound(format!("slot {}", offer.slot_id)))?;
        if slot.status != CancellationStatus::Open {
            if let Err(e) = self
                .ledger
                .transition_offer(offer.id, OfferState::Canceled, now)
                .await
            {
                debug!("Offer {} already resolved: {}", offer.id, e);
            }
            drop(guard);
            info!("Slot {} no longer available for patient {}", slot.id, patient.id);
            let reply = templates::too_late_notice();
            self.send_and_log(offer.id, &patient.phone, &reply, now).await;
            return Ok((ClaimOutcome::TooLate, reply));
        }

        // Winning path: both transitions happen inside the critical section.
        // The accept can still lose to the sweeper at the expiry boundary,
        // in which case the slot stays untouched and the claim is too late.
        if let Err(e) = self
            .ledger
            .transition_offer(offer.id, OfferState::Accepted, now)
            .await
        {
            drop(guard);
            info!("Offer {} resolved before claim committed: {}", offer.id, e);
            let reply = templates::too_late_notice();
            self.send_and_log(offer.id, &patient.phone, &reply, now).await;
            return Ok((ClaimOutcome::TooLate, reply));
        }
        let slot = self.ledger.mark_slot_filled(slot.id, patient.id, now).await?;

        let siblings = self.ledger.pending_siblings(slot.id, offer.id).await;
        for sibling in &siblings {
            if let Err(e) = self
                .ledger
                .transition_offer(sibling.id, OfferState::Canceled, now)
                .await
            {
                debug!("Sibling offer {} already resolved: {}", sibling.id, e);
            }
        }
        drop(guard);

        info!("Patient {} claimed slot {}", patient.id, slot.id);

        // The winner is scheduled now; retire their waitlist entry
        if let Some(entry) = self.directory.active_entry_for_patient(patient.id).await {
            if let Err(e) = self.directory.set_entry_active(entry.id, false).await {
                warn!("Failed to deactivate waitlist entry {}: {}", entry.id, e);
            }
        }

        let provider_name = self.provider_display_name(&slot).await;
        let reply =
            templates::win_confirmation(slot.slot_start_at, &slot.location, &provider_name);
        self.send_and_log(offer.id, &patient.phone, &reply, now).await;

        for sibling in siblings {
            if let Some(other) = self.directory.get_patient(sibling.patient_id).await {
                let notice = templates::slot_filled_notice();
                self.send_and_log(sibling.id, &other.phone, &notice, now).await;
            }
        }

        Ok((ClaimOutcome::Claimed { slot }, reply))
    }

    async fn provider_display_name(&self, slot: &CancellationSlot) -> String {
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

    /// Notification failures are logged and recorded, never propagated; a
    /// claim that already committed stays committed.
    async fn send_and_log(&self, offer_id: Uuid, to: &str, body: &str, now: DateTime<Utc>) {
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
                error!("Failed to send reply to {}: {}", to, e);
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
