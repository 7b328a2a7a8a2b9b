use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationStatus {
    Open,
    Filled,
    Expired,
    Aborted,
}

impl CancellationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CancellationStatus::Open)
    }

    pub fn can_transition_to(&self, target: &CancellationStatus) -> bool {
        use CancellationStatus::*;
        matches!((self, target), (Open, Filled) | (Open, Expired) | (Open, Aborted))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferState {
    Pending,
    Accepted,
    Declined,
    Expired,
    Canceled,
    Failed,
}

impl OfferState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OfferState::Pending)
    }

    pub fn can_transition_to(&self, target: &OfferState) -> bool {
        use OfferState::*;
        match (self, target) {
            (Pending, Accepted) => true,
            (Pending, Declined) => true,
            (Pending, Expired) => true,
            (Pending, Canceled) => true,
            (Pending, Failed) => true,
            _ => false,
        }
    }
}

/// A canceled appointment opportunity that the waitlist can backfill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationSlot {
    pub id: Uuid,
    pub provider_id: Option<Uuid>,
    pub location: String,
    pub slot_start_at: DateTime<Utc>,
    pub slot_end_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: CancellationStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub filled_by_patient_id: Option<Uuid>,
}

/// One SMS proposal of a slot to one patient, with its hold timer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub batch_number: u32,
    pub sent_at: DateTime<Utc>,
    pub hold_expires_at: DateTime<Utc>,
    pub state: OfferState,
    pub accepted_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(
        slot_id: Uuid,
        patient_id: Uuid,
        batch_number: u32,
        sent_at: DateTime<Utc>,
        hold_expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot_id,
            patient_id,
            batch_number,
            sent_at,
            hold_expires_at,
            state: OfferState::Pending,
            accepted_at: None,
            declined_at: None,
            created_at: sent_at,
        }
    }
}

/// Request body for registering a cancellation.
#[derive(Debug, Clone, Deserialize)]
pub struct CancellationCreate {
    pub provider_id: Option<Uuid>,
    pub location: String,
    pub slot_start_at: DateTime<Utc>,
    pub slot_end_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// Inbound SMS webhook form payload, named the way the provider posts it.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundSmsForm {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}
