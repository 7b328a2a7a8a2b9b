use chrono::Utc;
use uuid::Uuid;

use messaging_cell::{MessageDirection, MessageLog, MessageStatus};

#[tokio::test]
async fn outbound_and_inbound_rows_are_linked_and_queryable() {
    let log = MessageLog::new();
    let now = Utc::now();
    let offer_id = Uuid::new_v4();

    log.record_outbound(
        Some(offer_id),
        "+15550001111",
        "+12145551234",
        "offer text",
        Some("SM1".to_string()),
        MessageStatus::Sent,
        None,
        now,
    )
    .await;
    log.record_inbound("+12145551234", "+15550001111", "YES", Some("SM2".to_string()), now)
        .await;

    let all = log.all().await;
    assert_eq!(all.len(), 2);

    let for_offer = log.for_offer(offer_id).await;
    assert_eq!(for_offer.len(), 1);
    assert_eq!(for_offer[0].direction, MessageDirection::Outbound);
    assert_eq!(for_offer[0].status, MessageStatus::Sent);
    assert_eq!(for_offer[0].sent_at, Some(now));

    let inbound = all
        .iter()
        .find(|r| r.direction == MessageDirection::Inbound)
        .expect("inbound row recorded");
    assert_eq!(inbound.status, MessageStatus::Received);
    assert_eq!(inbound.received_at, Some(now));
    assert_eq!(inbound.offer_id, None);
}

#[tokio::test]
async fn failed_sends_keep_the_error_detail() {
    let log = MessageLog::new();
    let now = Utc::now();
    let offer_id = Uuid::new_v4();

    log.record_outbound(
        Some(offer_id),
        "+15550001111",
        "+12145551234",
        "offer text",
        None,
        MessageStatus::Failed,
        Some("unreachable".to_string()),
        now,
    )
    .await;

    let rows = log.for_offer(offer_id).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, MessageStatus::Failed);
    assert_eq!(rows[0].error_message.as_deref(), Some("unreachable"));
    assert!(rows[0].provider_sid.is_none());
}
