#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use messaging_cell::{MessageLog, MockSmsChannel, NotificationChannel};
use offer_cell::{
    AcceptanceResolver, CancellationSlot, DeclineResolver, HoldTimerSweeper, Offer,
    OfferBatchDispatcher, SlotLedger,
};
use shared_config::AppConfig;
use waitlist_cell::services::prioritizer;
use waitlist_cell::{NewWaitlistEntry, Patient, PatientDirectory};

pub fn test_config(batch_size: usize, hold_minutes: i64) -> AppConfig {
    AppConfig {
        twilio_account_sid: String::new(),
        twilio_auth_token: String::new(),
        twilio_from_number: "+15550001111".to_string(),
        batch_size,
        hold_minutes,
        sweep_interval_seconds: 30,
        priority_recalc_interval_minutes: 60,
        use_mock_sms: true,
    }
}

pub struct TestHarness {
    pub directory: Arc<PatientDirectory>,
    pub ledger: Arc<SlotLedger>,
    pub channel: Arc<MockSmsChannel>,
    pub messages: Arc<MessageLog>,
    pub dispatcher: Arc<OfferBatchDispatcher>,
    pub acceptance: Arc<AcceptanceResolver>,
    pub decline: Arc<DeclineResolver>,
    pub sweeper: HoldTimerSweeper,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_batch(3, 7)
    }

    pub fn with_batch(batch_size: usize, hold_minutes: i64) -> Self {
        let config = test_config(batch_size, hold_minutes);
        let directory = Arc::new(PatientDirectory::new());
        let ledger = Arc::new(SlotLedger::new());
        let messages = Arc::new(MessageLog::new());
        let channel = Arc::new(MockSmsChannel::new());
        let channel_dyn: Arc<dyn NotificationChannel> = channel.clone();

        let dispatcher = Arc::new(OfferBatchDispatcher::new(
            ledger.clone(),
            directory.clone(),
            channel_dyn.clone(),
            messages.clone(),
            &config,
        ));
        let acceptance = Arc::new(AcceptanceResolver::new(
            ledger.clone(),
            directory.clone(),
            channel_dyn,
            messages.clone(),
            &config,
        ));
        let decline = Arc::new(DeclineResolver::new(
            ledger.clone(),
            directory.clone(),
            dispatcher.clone(),
        ));
        let sweeper = HoldTimerSweeper::new(
            ledger.clone(),
            dispatcher.clone(),
            config.sweep_interval_seconds,
        );

        Self {
            directory,
            ledger,
            channel,
            messages,
            dispatcher,
            acceptance,
            decline,
            sweeper,
        }
    }

    /// Create a patient and put them on the waitlist with the given scoring
    /// inputs, relative to `now`.
    pub async fn enroll(
        &self,
        phone: &str,
        name: &str,
        urgent: bool,
        boost: i32,
        target_days_out: Option<i64>,
        joined_days_ago: i64,
        now: DateTime<Utc>,
    ) -> Patient {
        let patient = self
            .directory
            .find_or_create_patient(phone, Some(name))
            .await
            .expect("failed to create patient");
        self.directory
            .create_entry(NewWaitlistEntry {
                patient_id: patient.id,
                provider_preference: None,
                provider_type_preference: None,
                target_appt_at: target_days_out.map(|d| now + Duration::days(d)),
                urgent,
                manual_boost: boost,
                joined_at: now - Duration::days(joined_days_ago),
                notes: None,
            })
            .await
            .expect("failed to create waitlist entry");
        patient
    }

    pub async fn refresh_scores(&self, now: DateTime<Utc>) {
        prioritizer::refresh_all_scores(&self.directory, now).await;
    }

    pub async fn open_slot(
        &self,
        provider_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CancellationSlot {
        self.ledger
            .create_slot(
                provider_id,
                "Main Clinic",
                now + Duration::days(1),
                now + Duration::days(1) + Duration::minutes(30),
                None,
                now,
            )
            .await
            .expect("failed to create slot")
    }

    pub async fn offer_for(&self, slot_id: Uuid, patient_id: Uuid) -> Offer {
        self.ledger
            .offers_for_slot(slot_id)
            .await
            .into_iter()
            .find(|o| o.patient_id == patient_id)
            .expect("expected an offer for patient")
    }
}
