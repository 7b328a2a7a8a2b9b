//! Priority scoring for waitlist entries.
//!
//! Scoring components:
//! - urgent flag: +30
//! - manual boost: 0-40 (staff controlled)
//! - days until the patient's current appointment: 0-20
//! - waitlist seniority: +1 per 30 days, capped at 10
//!
//! Higher score = offered first.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::{PatientDirectory, WaitlistEntry, WaitlistError};

/// Compute the priority score for one entry. Pure and deterministic: the
/// same entry and clock always produce the same score.
pub fn priority_score(entry: &WaitlistEntry, now: DateTime<Utc>) -> i32 {
    let mut score = 0;

    if entry.urgent {
        score += 30;
    }

    score += entry.manual_boost;

    if let Some(target) = entry.target_appt_at {
        let days_until = (target - now).num_days();
        if days_until >= 180 {
            score += 20;
        } else if days_until >= 90 {
            score += 10;
        } else if days_until >= 30 {
            score += 5;
        }
    }

    let days_on_waitlist = (now - entry.joined_at).num_days().max(0);
    score += (days_on_waitlist / 30).min(10) as i32;

    score
}

/// Recompute and store the score for a single entry.
pub async fn refresh_entry_score(
    directory: &PatientDirectory,
    entry_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i32, WaitlistError> {
    let entry = directory
        .all_entries()
        .await
        .into_iter()
        .find(|e| e.id == entry_id)
        .ok_or_else(|| WaitlistError::NotFound(format!("waitlist entry {}", entry_id)))?;
    let score = priority_score(&entry, now);
    directory.store_score(entry_id, score).await?;
    Ok(score)
}

/// Recompute scores for every active entry. Runs periodically and on demand;
/// concurrent readers may observe a mix of old and new scores, which is fine.
pub async fn refresh_all_scores(directory: &PatientDirectory, now: DateTime<Utc>) -> usize {
    let entries = directory.active_entries().await;
    let mut updated = 0;
    for entry in entries {
        let score = priority_score(&entry, now);
        if directory.store_score(entry.id, score).await.is_ok() {
            updated += 1;
        }
    }
    updated
}

/// Apply a manual boost to a patient's active entry and recompute its score.
pub async fn boost_priority(
    directory: &PatientDirectory,
    patient_id: Uuid,
    amount: i32,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<WaitlistEntry, WaitlistError> {
    let entry = directory.set_boost(patient_id, amount, reason, now).await?;
    let score = priority_score(&entry, now);
    let entry = directory.store_score(entry.id, score).await?;
    info!("Boosted patient {} priority to {}", patient_id, score);
    Ok(entry)
}

/// Waitlist ordered by priority score descending, unscored entries last,
/// earliest joiner first on ties.
pub async fn prioritized_waitlist(
    directory: &PatientDirectory,
    limit: Option<usize>,
    active_only: bool,
) -> Vec<WaitlistEntry> {
    let mut entries = if active_only {
        directory.active_entries().await
    } else {
        directory.all_entries().await
    };

    entries.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then(a.joined_at.cmp(&b.joined_at))
    });

    if let Some(limit) = limit {
        entries.truncate(limit);
    }
    entries
}
