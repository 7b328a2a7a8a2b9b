use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{MessageDirection, MessageRecord, MessageStatus};

/// Append-only audit trail of every SMS, inbound and outbound.
#[derive(Default)]
pub struct MessageLog {
    rows: RwLock<Vec<MessageRecord>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_outbound(
        &self,
        offer_id: Option<Uuid>,
        from_phone: &str,
        to_phone: &str,
        body: &str,
        provider_sid: Option<String>,
        status: MessageStatus,
        error_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let record = MessageRecord {
            id: Uuid::new_v4(),
            offer_id,
            direction: MessageDirection::Outbound,
            from_phone: from_phone.to_string(),
            to_phone: to_phone.to_string(),
            body: body.to_string(),
            provider_sid,
            status,
            error_message,
            sent_at: Some(now),
            received_at: None,
            created_at: now,
        };
        let id = record.id;
        self.rows.write().await.push(record);
        id
    }

    pub async fn record_inbound(
        &self,
        from_phone: &str,
        to_phone: &str,
        body: &str,
        provider_sid: Option<String>,
        now: DateTime<Utc>,
    ) -> Uuid {
        let record = MessageRecord {
            id: Uuid::new_v4(),
            offer_id: None,
            direction: MessageDirection::Inbound,
            from_phone: from_phone.to_string(),
            to_phone: to_phone.to_string(),
            body: body.to_string(),
            provider_sid,
            status: MessageStatus::Received,
            error_message: None,
            sent_at: None,
            received_at: Some(now),
            created_at: now,
        };
        let id = record.id;
        self.rows.write().await.push(record);
        id
    }

    pub async fn for_offer(&self, offer_id: Uuid) -> Vec<MessageRecord> {
        self.rows
            .read()
            .await
            .iter()
            .filter(|r| r.offer_id == Some(offer_id))
            .cloned()
            .collect()
    }

    pub async fn all(&self) -> Vec<MessageRecord> {
        self.rows.read().await.clone()
    }
}
