mod support;

use chrono::Utc;
use offer_cell::{CancellationStatus, OfferError, OfferState};
use support::TestHarness;

#[tokio::test]
async fn first_dispatch_offers_highest_priority_batch() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let high = harness.enroll("+15550000001", "High", true, 20, None, 0, now).await;
    let mid = harness.enroll("+15550000002", "Mid", false, 20, None, 0, now).await;
    let low = harness.enroll("+15550000003", "Low", false, 0, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    let sent = harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch failed");
    assert_eq!(sent, 2);

    let offers = harness.ledger.offers_for_slot(slot.id).await;
    assert_eq!(offers.len(), 2);
    assert!(offers.iter().all(|o| o.batch_number == 1));
    assert!(offers.iter().all(|o| o.state == OfferState::Pending));

    let offered: Vec<_> = offers.iter().map(|o| o.patient_id).collect();
    assert!(offered.contains(&high.id));
    assert!(offered.contains(&mid.id));
    assert!(!offered.contains(&low.id));

    // Both winners got an SMS with the hold window spelled out
    assert_eq!(harness.channel.sent().len(), 2);
    assert!(harness.channel.sent()[0].body.contains("7 min"));
}

#[tokio::test]
async fn dispatch_returns_zero_while_batch_in_flight() {
    let harness = TestHarness::with_batch(1, 7);
    let now = Utc::now();

    harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    assert_eq!(harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch"), 1);

    // Batch 1 is still pending: a second dispatch must be a no-op
    assert_eq!(harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch"), 0);
    assert_eq!(harness.ledger.offers_for_slot(slot.id).await.len(), 1);
}

#[tokio::test]
async fn exhausted_slot_expires_and_returns_zero() {
    let harness = TestHarness::new();
    let now = Utc::now();

    let slot = harness.open_slot(None, now).await;
    let sent = harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch failed");

    assert_eq!(sent, 0);
    let slot = harness.ledger.get_slot(slot.id).await.expect("slot exists");
    assert_eq!(slot.status, CancellationStatus::Expired);
}

#[tokio::test]
async fn dispatch_unknown_slot_is_not_found() {
    let harness = TestHarness::new();
    let result = harness.dispatcher.dispatch_at(uuid::Uuid::new_v4(), Utc::now()).await;
    assert!(matches!(result, Err(OfferError::NotFound(_))));
}

#[tokio::test]
async fn delivery_failure_isolates_to_one_offer() {
    let harness = TestHarness::new();
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 30, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 20, None, 0, now).await;
    let c = harness.enroll("+15550000003", "C", false, 10, None, 0, now).await;
    harness.refresh_scores(now).await;
    harness.channel.fail_number(&b.phone);

    let slot = harness.open_slot(None, now).await;
    let sent = harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch failed");
    assert_eq!(sent, 2, "the two deliverable offers still go out");

    assert_eq!(harness.offer_for(slot.id, a.id).await.state, OfferState::Pending);
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Failed);
    assert_eq!(harness.offer_for(slot.id, c.id).await.state, OfferState::Pending);

    // The failed patient keeps an untouched contact timestamp
    let b_after = harness.directory.get_patient(b.id).await.expect("patient");
    assert!(b_after.last_contacted_at.is_none());
    let a_after = harness.directory.get_patient(a.id).await.expect("patient");
    assert_eq!(a_after.last_contacted_at, Some(now));
}

#[tokio::test]
async fn a_fully_failed_batch_rolls_straight_into_the_next() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 30, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 20, None, 0, now).await;
    let c = harness.enroll("+15550000003", "C", false, 10, None, 0, now).await;
    harness.refresh_scores(now).await;
    harness.channel.fail_number(&a.phone);
    harness.channel.fail_number(&b.phone);

    let slot = harness.open_slot(None, now).await;
    let sent = harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch failed");

    // Batch 1 went entirely undeliverable; with no pending offer to expire,
    // no timer would ever advance the slot, so dispatch moves on itself
    assert_eq!(sent, 1);
    assert_eq!(harness.offer_for(slot.id, a.id).await.state, OfferState::Failed);
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Failed);

    let c_offer = harness.offer_for(slot.id, c.id).await;
    assert_eq!(c_offer.state, OfferState::Pending);
    assert_eq!(c_offer.batch_number, 2);
}

#[tokio::test]
async fn patients_are_never_offered_the_same_slot_twice() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    // Resolve batch 1, then advance; the second batch has nobody left
    harness.decline.decline_at(&a.phone, now).await.expect("decline");
    harness.decline.decline_at(&b.phone, now).await.expect("decline");

    let offers = harness.ledger.offers_for_slot(slot.id).await;
    let mut pairs: Vec<_> = offers.iter().map(|o| (o.slot_id, o.patient_id)).collect();
    pairs.sort();
    pairs.dedup();
    assert_eq!(pairs.len(), offers.len(), "one offer row per (slot, patient)");

    let slot = harness.ledger.get_slot(slot.id).await.expect("slot");
    assert_eq!(slot.status, CancellationStatus::Expired);
}

#[tokio::test]
async fn batch_numbers_stay_dense_and_gated() {
    let harness = TestHarness::with_batch(1, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 30, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 20, None, 0, now).await;
    let c = harness.enroll("+15550000003", "C", false, 10, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");
    harness.decline.decline_at(&a.phone, now).await.expect("decline");
    harness.decline.decline_at(&b.phone, now).await.expect("decline");

    let mut batches: Vec<u32> = harness
        .ledger
        .offers_for_slot(slot.id)
        .await
        .iter()
        .map(|o| o.batch_number)
        .collect();
    batches.sort();
    assert_eq!(batches, vec![1, 2, 3]);
    assert_eq!(harness.offer_for(slot.id, c.id).await.batch_number, 3);
}

#[tokio::test]
async fn abort_cancels_pending_offers_and_notifies() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");
    let sent_before = harness.channel.sent().len();

    let slot = harness.dispatcher.abort_at(slot.id, now).await.expect("abort failed");
    assert_eq!(slot.status, CancellationStatus::Aborted);
    assert_eq!(harness.offer_for(slot.id, a.id).await.state, OfferState::Canceled);
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Canceled);
    assert_eq!(harness.channel.sent().len(), sent_before + 2);

    // Aborted is terminal; a second abort is a conflict, not a transition
    let result = harness.dispatcher.abort_at(slot.id, now).await;
    assert!(matches!(result, Err(OfferError::InvalidTransition { .. })));
}
