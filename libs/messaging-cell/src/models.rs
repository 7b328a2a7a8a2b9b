use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageDirection {
    Outbound,
    Inbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Sent,
    Failed,
    Received,
}

/// One audit row per SMS that crossed the wire, in either direction.
///
/// Bodies stay free of medical detail; this is a delivery trail, not a chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub offer_id: Option<Uuid>,
    pub direction: MessageDirection,
    pub from_phone: String,
    pub to_phone: String,
    pub body: String,
    pub provider_sid: Option<String>,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
