use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::AppError;

use crate::services::prioritizer;
use crate::{NewWaitlistEntry, PatientBoost, PatientDirectory, WaitlistEntryCreate};

/// Add a patient to the waitlist, creating the contact record when needed.
pub async fn add_to_waitlist(
    State(directory): State<Arc<PatientDirectory>>,
    Json(request): Json<WaitlistEntryCreate>,
) -> Result<Json<Value>, AppError> {
    let patient = directory
        .find_or_create_patient(&request.patient_phone, request.patient_name.as_deref())
        .await?;

    let now = Utc::now();
    let entry = directory
        .create_entry(NewWaitlistEntry {
            patient_id: patient.id,
            provider_preference: request.provider_preference,
            provider_type_preference: request.provider_type_preference,
            target_appt_at: request.target_appt_at,
            urgent: request.urgent,
            manual_boost: request.manual_boost,
            joined_at: now,
            notes: request.notes,
        })
        .await?;

    let score = prioritizer::refresh_entry_score(&directory, entry.id, now).await?;

    Ok(Json(json!({
        "id": entry.id,
        "patient_id": patient.id,
        "patient_phone": patient.phone,
        "priority_score": score,
        "joined_at": entry.joined_at,
    })))
}

/// Manually boost a patient's priority.
pub async fn boost_priority(
    State(directory): State<Arc<PatientDirectory>>,
    Path(patient_id): Path<Uuid>,
    Json(boost): Json<PatientBoost>,
) -> Result<Json<Value>, AppError> {
    let entry = prioritizer::boost_priority(
        &directory,
        patient_id,
        boost.amount,
        boost.reason.as_deref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "manual_boost": entry.manual_boost,
        "priority_score": entry.priority_score,
        "reason": boost.reason,
    })))
}

/// Recalculate every active entry's score. The periodic job does the same;
/// this endpoint lets staff force a pass.
pub async fn recalculate_priorities(
    State(directory): State<Arc<PatientDirectory>>,
) -> Result<Json<Value>, AppError> {
    let now = Utc::now();
    let count = prioritizer::refresh_all_scores(&directory, now).await;
    info!("Recalculated {} priority scores", count);

    Ok(Json(json!({
        "updated_count": count,
        "timestamp": now,
    })))
}

#[derive(Debug, Deserialize)]
pub struct WaitlistQuery {
    pub limit: Option<usize>,
    pub active_only: Option<bool>,
}

/// Prioritized waitlist listing for the dashboard.
pub async fn get_waitlist(
    State(directory): State<Arc<PatientDirectory>>,
    Query(query): Query<WaitlistQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.or(Some(50));
    let active_only = query.active_only.unwrap_or(true);
    let entries = prioritizer::prioritized_waitlist(&directory, limit, active_only).await;

    let mut rows = Vec::with_capacity(entries.len());
    for entry in &entries {
        let patient = directory.get_patient(entry.patient_id).await;
        rows.push(json!({
            "id": entry.id,
            "patient_id": entry.patient_id,
            "patient_name": patient.as_ref().and_then(|p| p.display_name.clone()),
            "patient_phone": patient.as_ref().map(|p| p.phone.clone()),
            "priority_score": entry.priority_score,
            "urgent": entry.urgent,
            "manual_boost": entry.manual_boost,
            "joined_at": entry.joined_at,
        }));
    }

    Ok(Json(json!({
        "count": rows.len(),
        "entries": rows,
    })))
}
