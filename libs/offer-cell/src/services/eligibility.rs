//! Candidate selection for a slot's next batch.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use waitlist_cell::{PatientDirectory, Provider, WaitlistEntry};

use crate::CancellationSlot;

/// Whether an entry's preferences admit this provider.
///
/// A slot with no provider matches everyone. Otherwise the entry qualifies
/// when its type preference is absent or "Any", equals the provider's type,
/// or its provider-name list contains the provider's name.
pub fn matches_provider_preference(entry: &WaitlistEntry, provider: Option<&Provider>) -> bool {
    let Some(provider) = provider else {
        return true;
    };

    let type_ok = match entry.provider_type_preference.as_deref() {
        None => true,
        Some(pref) => pref.eq_ignore_ascii_case("any") || pref == provider.provider_type,
    };
    let name_ok = entry
        .provider_preference
        .as_ref()
        .is_some_and(|names| names.iter().any(|n| n == &provider.name));

    type_ok || name_ok
}

/// Produces the ranked candidate list for each batch.
pub struct EligibilityFilter {
    directory: Arc<PatientDirectory>,
}

impl EligibilityFilter {
    pub fn new(directory: Arc<PatientDirectory>) -> Self {
        Self { directory }
    }

    /// The next `batch_size` eligible entries for `slot`, best first.
    ///
    /// Filters to active entries whose patient has not opted out and is not
    /// in the exclusion set, applies the preference predicate, then orders
    /// by priority score descending (unscored last) with earliest joiner
    /// winning ties. An empty result means nobody is left to ask.
    pub async fn next_batch(
        &self,
        slot: &CancellationSlot,
        exclude_patient_ids: &HashSet<Uuid>,
        batch_size: usize,
    ) -> Vec<WaitlistEntry> {
        let provider = match slot.provider_id {
            Some(id) => self.directory.get_provider(id).await,
            None => None,
        };

        let mut candidates = Vec::new();
        for entry in self.directory.active_entries().await {
            if exclude_patient_ids.contains(&entry.patient_id) {
                continue;
            }
            let Some(patient) = self.directory.get_patient(entry.patient_id).await else {
                continue;
            };
            if patient.opt_out {
                continue;
            }
            if !matches_provider_preference(&entry, provider.as_ref()) {
                continue;
            }
            candidates.push(entry);
        }

        candidates.sort_by(|a, b| {
            b.priority_score
                .cmp(&a.priority_score)
                .then(a.joined_at.cmp(&b.joined_at))
        });
        candidates.truncate(batch_size);

        debug!(
            "Eligibility for slot {}: {} candidate(s) after filtering",
            slot.id,
            candidates.len()
        );
        candidates
    }
}
