mod support;

use chrono::{Duration, Utc};
use offer_cell::{CancellationStatus, OfferState};
use support::TestHarness;

#[tokio::test]
async fn sweep_expires_overdue_offers_and_advances_batch() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 30, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 20, None, 0, now).await;
    let c = harness.enroll("+15550000003", "C", false, 10, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    // Nobody answers; the timer does the resolving
    let advanced = harness.sweeper.sweep(now + Duration::minutes(7)).await;
    assert_eq!(advanced, 1);

    assert_eq!(harness.offer_for(slot.id, a.id).await.state, OfferState::Expired);
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Expired);

    let offer = harness.offer_for(slot.id, c.id).await;
    assert_eq!(offer.batch_number, 2);
    assert_eq!(offer.state, OfferState::Pending);
}

#[tokio::test]
async fn sweep_with_nothing_overdue_is_a_noop() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    assert_eq!(harness.sweeper.sweep(now + Duration::minutes(3)).await, 0);
    let offers = harness.ledger.offers_for_slot(slot.id).await;
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].state, OfferState::Pending);
}

#[tokio::test]
async fn repeated_sweeps_are_idempotent() {
    let harness = TestHarness::with_batch(1, 7);
    let now = Utc::now();

    harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    let later = now + Duration::minutes(7);
    assert_eq!(harness.sweeper.sweep(later).await, 1);
    // Batch 2 is freshly pending; a second sweep at the same instant finds
    // nothing overdue and must not advance anything
    assert_eq!(harness.sweeper.sweep(later).await, 0);
    assert_eq!(harness.ledger.offers_for_slot(slot.id).await.len(), 2);
}

#[tokio::test]
async fn sweep_expires_final_batch_then_next_sweep_closes_the_slot() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    // Both offers lapse and nobody is left: the advance attempt exhausts
    // the waitlist and the slot expires
    let advanced = harness.sweeper.sweep(now + Duration::minutes(7)).await;
    assert_eq!(advanced, 0);

    let slot = harness.ledger.get_slot(slot.id).await.expect("slot");
    assert_eq!(slot.status, CancellationStatus::Expired);
}

#[tokio::test]
async fn sweep_ignores_filled_slots() {
    let harness = TestHarness::with_batch(2, 7);
    let now = Utc::now();

    let a = harness.enroll("+15550000001", "A", false, 10, None, 0, now).await;
    let b = harness.enroll("+15550000002", "B", false, 5, None, 0, now).await;
    harness.refresh_scores(now).await;

    let slot = harness.open_slot(None, now).await;
    harness.dispatcher.dispatch_at(slot.id, now).await.expect("dispatch");

    let (outcome, _) = harness
        .acceptance
        .accept_at(&a.phone, now + Duration::minutes(1))
        .await
        .expect("accept failed");
    assert!(outcome.claimed());

    // B's offer was already canceled by the win; the sweep finds nothing
    let advanced = harness.sweeper.sweep(now + Duration::minutes(7)).await;
    assert_eq!(advanced, 0);

    let slot = harness.ledger.get_slot(slot.id).await.expect("slot");
    assert_eq!(slot.status, CancellationStatus::Filled);
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Canceled);
}
