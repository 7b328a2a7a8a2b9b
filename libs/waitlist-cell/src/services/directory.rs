use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_utils::phone::is_e164;

use crate::{
    NewWaitlistEntry, Patient, Provider, WaitlistEntry, WaitlistError, MAX_MANUAL_BOOST,
};

#[derive(Default)]
struct DirectoryTables {
    patients: HashMap<Uuid, Patient>,
    phone_index: HashMap<String, Uuid>,
    providers: HashMap<Uuid, Provider>,
    entries: HashMap<Uuid, WaitlistEntry>,
}

/// Durable home of patients, providers, and waitlist entries.
///
/// Tables live behind a single `RwLock`; every public method is one
/// consistent read or write against them.
#[derive(Default)]
pub struct PatientDirectory {
    tables: RwLock<DirectoryTables>,
}

impl PatientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_or_create_patient(
        &self,
        phone: &str,
        display_name: Option<&str>,
    ) -> Result<Patient, WaitlistError> {
        if !is_e164(phone) {
            return Err(WaitlistError::Validation(format!(
                "phone {} is not in E.164 format",
                phone
            )));
        }

        let mut tables = self.tables.write().await;
        if let Some(id) = tables.phone_index.get(phone) {
            let patient = tables
                .patients
                .get(id)
                .cloned()
                .ok_or_else(|| WaitlistError::NotFound(format!("patient {}", id)))?;
            return Ok(patient);
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            display_name: display_name.map(str::to_string),
            opt_out: false,
            last_contacted_at: None,
            created_at: Utc::now(),
        };
        tables.phone_index.insert(phone.to_string(), patient.id);
        tables.patients.insert(patient.id, patient.clone());
        info!("Created patient {} ({})", patient.id, patient.phone);
        Ok(patient)
    }

    pub async fn get_patient(&self, id: Uuid) -> Option<Patient> {
        self.tables.read().await.patients.get(&id).cloned()
    }

    pub async fn find_by_phone(&self, phone: &str) -> Option<Patient> {
        let tables = self.tables.read().await;
        let id = tables.phone_index.get(phone)?;
        tables.patients.get(id).cloned()
    }

    /// Set the opt-out flag, creating a bare record for unknown numbers so
    /// the choice survives even if staff add the patient later.
    pub async fn set_opt_out(&self, phone: &str, opt_out: bool) -> Patient {
        let mut tables = self.tables.write().await;
        if let Some(id) = tables.phone_index.get(phone).copied() {
            if let Some(patient) = tables.patients.get_mut(&id) {
                patient.opt_out = opt_out;
                info!("Patient {} opt_out set to {}", id, opt_out);
                return patient.clone();
            }
        }

        let patient = Patient {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            display_name: None,
            opt_out,
            last_contacted_at: None,
            created_at: Utc::now(),
        };
        tables.phone_index.insert(phone.to_string(), patient.id);
        tables.patients.insert(patient.id, patient.clone());
        info!("Created opted-out patient record for {}", phone);
        patient
    }

    pub async fn touch_last_contacted(&self, patient_id: Uuid, now: DateTime<Utc>) {
        let mut tables = self.tables.write().await;
        if let Some(patient) = tables.patients.get_mut(&patient_id) {
            patient.last_contacted_at = Some(now);
        }
    }

    pub async fn add_provider(&self, name: &str, provider_type: &str) -> Provider {
        let provider = Provider {
            id: Uuid::new_v4(),
            name: name.to_string(),
            provider_type: provider_type.to_string(),
            active: true,
        };
        self.tables
            .write()
            .await
            .providers
            .insert(provider.id, provider.clone());
        provider
    }

    pub async fn get_provider(&self, id: Uuid) -> Option<Provider> {
        self.tables.read().await.providers.get(&id).cloned()
    }

    pub async fn create_entry(
        &self,
        new: NewWaitlistEntry,
    ) -> Result<WaitlistEntry, WaitlistError> {
        if !(0..=MAX_MANUAL_BOOST).contains(&new.manual_boost) {
            return Err(WaitlistError::Validation(format!(
                "manual_boost must be between 0 and {}",
                MAX_MANUAL_BOOST
            )));
        }

        let mut tables = self.tables.write().await;
        if !tables.patients.contains_key(&new.patient_id) {
            return Err(WaitlistError::NotFound(format!("patient {}", new.patient_id)));
        }
        if let Some(existing) = tables
            .entries
            .values()
            .find(|e| e.patient_id == new.patient_id && e.active)
        {
            return Err(WaitlistError::DuplicateEntry(format!(
                "patient already on active waitlist (entry {})",
                existing.id
            )));
        }

        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            provider_preference: new.provider_preference,
            provider_type_preference: new.provider_type_preference,
            target_appt_at: new.target_appt_at,
            urgent: new.urgent,
            manual_boost: new.manual_boost,
            active: true,
            joined_at: new.joined_at,
            priority_score: None,
            notes: new.notes,
        };
        tables.entries.insert(entry.id, entry.clone());
        info!("Added patient {} to waitlist (entry {})", entry.patient_id, entry.id);
        Ok(entry)
    }

    pub async fn set_entry_active(
        &self,
        entry_id: Uuid,
        active: bool,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| WaitlistError::NotFound(format!("waitlist entry {}", entry_id)))?;
        entry.active = active;
        debug!("Waitlist entry {} active set to {}", entry_id, active);
        Ok(entry.clone())
    }

    pub async fn active_entries(&self) -> Vec<WaitlistEntry> {
        self.tables
            .read()
            .await
            .entries
            .values()
            .filter(|e| e.active)
            .cloned()
            .collect()
    }

    pub async fn all_entries(&self) -> Vec<WaitlistEntry> {
        self.tables.read().await.entries.values().cloned().collect()
    }

    pub async fn active_entry_for_patient(&self, patient_id: Uuid) -> Option<WaitlistEntry> {
        self.tables
            .read()
            .await
            .entries
            .values()
            .find(|e| e.patient_id == patient_id && e.active)
            .cloned()
    }

    pub async fn store_score(
        &self,
        entry_id: Uuid,
        score: i32,
    ) -> Result<WaitlistEntry, WaitlistError> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .get_mut(&entry_id)
            .ok_or_else(|| WaitlistError::NotFound(format!("waitlist entry {}", entry_id)))?;
        entry.priority_score = Some(score);
        Ok(entry.clone())
    }

    pub async fn set_boost(
        &self,
        patient_id: Uuid,
        amount: i32,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<WaitlistEntry, WaitlistError> {
        if !(0..=MAX_MANUAL_BOOST).contains(&amount) {
            return Err(WaitlistError::Validation(format!(
                "boost amount must be between 0 and {}",
                MAX_MANUAL_BOOST
            )));
        }

        let mut tables = self.tables.write().await;
        let entry = tables
            .entries
            .values_mut()
            .find(|e| e.patient_id == patient_id && e.active)
            .ok_or_else(|| {
                WaitlistError::NotFound(format!("active waitlist entry for patient {}", patient_id))
            })?;

        entry.manual_boost = amount;
        if let Some(reason) = reason {
            let note = format!("[{}] Manual boost: {} - {}", now.format("%Y-%m-%d %H:%M UTC"), amount, reason);
            match entry.notes.as_mut() {
                Some(notes) => {
                    notes.push('\n');
                    notes.push_str(&note);
                }
                None => entry.notes = Some(note),
            }
        }
        Ok(entry.clone())
    }
}
