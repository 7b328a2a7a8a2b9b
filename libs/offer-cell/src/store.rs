//! In-process ledger of cancellation slots and their offers.
//!
//! Tables live behind one `RwLock`; each public method is a single
//! consistent read or write. On top of that, every slot row has its own
//! async mutex: the exclusive lock that serializes claim attempts and batch
//! advancement for that slot. Callers that need a multi-step critical
//! section take the slot lock first, then call the table methods.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::{CancellationSlot, CancellationStatus, Offer, OfferError, OfferState};

#[derive(Default)]
struct LedgerTables {
    slots: HashMap<Uuid, CancellationSlot>,
    offers: HashMap<Uuid, Offer>,
}

#[derive(Default)]
pub struct SlotLedger {
    tables: RwLock<LedgerTables>,
    slot_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SlotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new cancellation slot in `Open` status.
    pub async fn create_slot(
        &self,
        provider_id: Option<Uuid>,
        location: &str,
        slot_start_at: DateTime<Utc>,
        slot_end_at: DateTime<Utc>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CancellationSlot, OfferError> {
        if slot_end_at <= slot_start_at {
            return Err(OfferError::InvalidInput(
                "slot_end_at must be after slot_start_at".to_string(),
            ));
        }

        let slot = CancellationSlot {
            id: Uuid::new_v4(),
            provider_id,
            location: location.to_string(),
            slot_start_at,
            slot_end_at,
            reason,
            status: CancellationStatus::Open,
            created_at: now,
            filled_at: None,
            filled_by_patient_id: None,
        };
        self.tables.write().await.slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    pub async fn get_slot(&self, slot_id: Uuid) -> Option<CancellationSlot> {
        self.tables.read().await.slots.get(&slot_id).cloned()
    }

    pub async fn open_slots(&self) -> Vec<CancellationSlot> {
        let mut slots: Vec<CancellationSlot> = self
            .tables
            .read()
            .await
            .slots
            .values()
            .filter(|s| s.status == CancellationStatus::Open)
            .cloned()
            .collect();
        slots.sort_by_key(|s| s.slot_start_at);
        slots
    }

    /// Acquire the exclusive row lock for a slot. Exactly one holder at a
    /// time; everyone mutating a slot's offer set or status mid-flow goes
    /// through here.
    pub async fn lock_slot(&self, slot_id: Uuid) -> Result<OwnedMutexGuard<()>, OfferError> {
        if !self.tables.read().await.slots.contains_key(&slot_id) {
            return Err(OfferError::NotFound(format!("slot {}", slot_id)));
        }

        let lock = {
            let mut locks = self.slot_locks.lock().await;
            locks
                .entry(slot_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        Ok(lock.lock_owned().await)
    }

    /// Move a slot to a terminal status, enforcing the transition table.
    pub async fn transition_slot(
        &self,
        slot_id: Uuid,
        target: CancellationStatus,
    ) -> Result<CancellationSlot, OfferError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| OfferError::NotFound(format!("slot {}", slot_id)))?;
        if !slot.status.can_transition_to(&target) {
            return Err(OfferError::InvalidTransition {
                from: format!("{:?}", slot.status),
                to: format!("{:?}", target),
            });
        }
        slot.status = target;
        debug!("Slot {} transitioned to {:?}", slot_id, target);
        Ok(slot.clone())
    }

    /// The winning transition: `Open -> Filled` with fill metadata.
    pub async fn mark_slot_filled(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CancellationSlot, OfferError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| OfferError::NotFound(format!("slot {}", slot_id)))?;
        if !slot.status.can_transition_to(&CancellationStatus::Filled) {
            return Err(OfferError::InvalidTransition {
                from: format!("{:?}", slot.status),
                to: format!("{:?}", CancellationStatus::Filled),
            });
        }
        slot.status = CancellationStatus::Filled;
        slot.filled_at = Some(now);
        slot.filled_by_patient_id = Some(patient_id);
        Ok(slot.clone())
    }

    /// Insert a pending offer. One offer per (slot, patient), ever.
    pub async fn insert_offer(&self, offer: Offer) -> Result<Offer, OfferError> {
        let mut tables = self.tables.write().await;
        if !tables.slots.contains_key(&offer.slot_id) {
            return Err(OfferError::NotFound(format!("slot {}", offer.slot_id)));
        }
        if tables
            .offers
            .values()
            .any(|o| o.slot_id == offer.slot_id && o.patient_id == offer.patient_id)
        {
            return Err(OfferError::InvalidInput(format!(
                "patient {} was already offered slot {}",
                offer.patient_id, offer.slot_id
            )));
        }
        tables.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    pub async fn get_offer(&self, offer_id: Uuid) -> Option<Offer> {
        self.tables.read().await.offers.get(&offer_id).cloned()
    }

    pub async fn offers_for_slot(&self, slot_id: Uuid) -> Vec<Offer> {
        self.tables
            .read()
            .await
            .offers
            .values()
            .filter(|o| o.slot_id == slot_id)
            .cloned()
            .collect()
    }

    /// The patient's most recently sent offer still in `Pending`.
    pub async fn latest_pending_offer_for_patient(&self, patient_id: Uuid) -> Option<Offer> {
        self.tables
            .read()
            .await
            .offers
            .values()
            .filter(|o| o.patient_id == patient_id && o.state == OfferState::Pending)
            .max_by_key(|o| o.sent_at)
            .cloned()
    }

    /// Move an offer to a terminal state, stamping the matching timestamp.
    pub async fn transition_offer(
        &self,
        offer_id: Uuid,
        target: OfferState,
        now: DateTime<Utc>,
    ) -> Result<Offer, OfferError> {
        let mut tables = self.tables.write().await;
        let offer = tables
            .offers
            .get_mut(&offer_id)
            .ok_or_else(|| OfferError::NotFound(format!("offer {}", offer_id)))?;
        if !offer.state.can_transition_to(&target) {
            return Err(OfferError::InvalidTransition {
                from: format!("{:?}", offer.state),
                to: format!("{:?}", target),
            });
        }
        offer.state = target;
        match target {
            OfferState::Accepted => offer.accepted_at = Some(now),
            OfferState::Declined => offer.declined_at = Some(now),
            _ => {}
        }
        debug!("Offer {} transitioned to {:?}", offer_id, target);
        Ok(offer.clone())
    }

    /// Expire every pending offer whose hold has lapsed. Returns the
    /// updated offers; safe to call repeatedly.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Vec<Offer> {
        let mut tables = self.tables.write().await;
        let mut expired = Vec::new();
        for offer in tables.offers.values_mut() {
            if offer.state == OfferState::Pending && offer.hold_expires_at <= now {
                offer.state = OfferState::Expired;
                expired.push(offer.clone());
            }
        }
        expired
    }

    /// Pending offers on a slot other than the winning one.
    pub async fn pending_siblings(&self, slot_id: Uuid, winning_offer_id: Uuid) -> Vec<Offer> {
        self.tables
            .read()
            .await
            .offers
            .values()
            .filter(|o| {
                o.slot_id == slot_id && o.id != winning_offer_id && o.state == OfferState::Pending
            })
            .cloned()
            .collect()
    }
}
