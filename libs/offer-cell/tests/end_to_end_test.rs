mod support;

use chrono::{Duration, Utc};
use offer_cell::{CancellationStatus, OfferState};
use support::TestHarness;

/// Full lifecycle: batch 1 partially declined, expired by the sweeper,
/// batch 2 claimed by the last eligible patient.
#[tokio::test]
async fn slot_flows_from_open_through_two_batches_to_filled() {
    let harness = TestHarness::with_batch(3, 7);
    let t0 = Utc::now();

    // Scores: A=62 (30 urgent + 10 boost + 20 distance + 2 seniority),
    // B=40, C=10, D=5
    let a = harness.enroll("+15550000001", "A", true, 10, Some(186), 61, t0).await;
    let b = harness.enroll("+15550000002", "B", false, 40, None, 0, t0).await;
    let c = harness.enroll("+15550000003", "C", false, 10, None, 0, t0).await;
    let d = harness.enroll("+15550000004", "D", false, 5, None, 0, t0).await;
    harness.refresh_scores(t0).await;

    let a_entry = harness
        .directory
        .active_entry_for_patient(a.id)
        .await
        .expect("entry exists");
    assert_eq!(a_entry.priority_score, Some(62));

    // Batch 1 goes to the top three
    let slot = harness.open_slot(None, t0).await;
    let sent = harness.dispatcher.dispatch_at(slot.id, t0).await.expect("dispatch");
    assert_eq!(sent, 3);
    for patient in [&a, &b, &c] {
        assert_eq!(harness.offer_for(slot.id, patient.id).await.batch_number, 1);
    }
    assert!(harness.channel.sent_to(&d.phone).is_empty());

    // B declines immediately; A and C stay pending so nothing advances
    harness
        .decline
        .decline_at(&b.phone, t0 + Duration::seconds(30))
        .await
        .expect("decline");
    assert_eq!(harness.offer_for(slot.id, b.id).await.state, OfferState::Declined);
    let offers = harness.ledger.offers_for_slot(slot.id).await;
    assert_eq!(offers.len(), 3);

    // Holds lapse at T0+7m; the sweep expires A and C and offers batch 2 to D
    let advanced = harness.sweeper.sweep(t0 + Duration::minutes(7)).await;
    assert_eq!(advanced, 1);
    assert_eq!(harness.offer_for(slot.id, a.id).await.state, OfferState::Expired);
    assert_eq!(harness.offer_for(slot.id, c.id).await.state, OfferState::Expired);

    let d_offer = harness.offer_for(slot.id, d.id).await;
    assert_eq!(d_offer.batch_number, 2);
    assert_eq!(d_offer.state, OfferState::Pending);

    // D accepts ten seconds later and wins the slot
    let (outcome, _) = harness
        .acceptance
        .accept_at(&d.phone, t0 + Duration::minutes(7) + Duration::seconds(10))
        .await
        .expect("accept failed");
    assert!(outcome.claimed());

    let slot = harness.ledger.get_slot(slot.id).await.expect("slot");
    assert_eq!(slot.status, CancellationStatus::Filled);
    assert_eq!(slot.filled_by_patient_id, Some(d.id));

    // Exclusivity held the whole way through
    let offers = harness.ledger.offers_for_slot(slot.id).await;
    assert_eq!(offers.iter().filter(|o| o.state == OfferState::Accepted).count(), 1);
    assert_eq!(offers.len(), 4);
}
