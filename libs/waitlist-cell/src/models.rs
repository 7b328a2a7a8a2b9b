use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound for staff-applied priority boosts, enforced at every write.
pub const MAX_MANUAL_BOOST: i32 = 40;

/// Minimal contact record for SMS communication. No diagnoses, no chart data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub phone: String,
    pub display_name: Option<String>,
    pub opt_out: bool,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Provider information used to match slots against waitlist preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    pub name: String,
    pub provider_type: String,
    pub active: bool,
}

/// One patient's place on the waitlist, with preferences and a cached
/// priority score. Entries are deactivated rather than deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub provider_preference: Option<Vec<String>>,
    pub provider_type_preference: Option<String>,
    pub target_appt_at: Option<DateTime<Utc>>,
    pub urgent: bool,
    pub manual_boost: i32,
    pub active: bool,
    pub joined_at: DateTime<Utc>,
    pub priority_score: Option<i32>,
    pub notes: Option<String>,
}

/// Arguments for creating a waitlist entry.
#[derive(Debug, Clone)]
pub struct NewWaitlistEntry {
    pub patient_id: Uuid,
    pub provider_preference: Option<Vec<String>>,
    pub provider_type_preference: Option<String>,
    pub target_appt_at: Option<DateTime<Utc>>,
    pub urgent: bool,
    pub manual_boost: i32,
    pub joined_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Request body for adding a patient to the waitlist.
#[derive(Debug, Clone, Deserialize)]
pub struct WaitlistEntryCreate {
    pub patient_phone: String,
    pub patient_name: Option<String>,
    pub provider_preference: Option<Vec<String>>,
    pub provider_type_preference: Option<String>,
    pub target_appt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub manual_boost: i32,
    pub notes: Option<String>,
}

/// Request body for boosting a patient's priority.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientBoost {
    pub amount: i32,
    pub reason: Option<String>,
}
