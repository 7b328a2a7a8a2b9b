use std::sync::Arc;

use axum::{
    extract::{Form, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use messaging_cell::{
    templates, InboundAction, MessageLog, MessageStatus, NotificationChannel,
};
use shared_models::AppError;
use waitlist_cell::PatientDirectory;

use crate::{
    AcceptanceResolver, CancellationCreate, DeclineResolver, InboundSmsForm,
    OfferBatchDispatcher, SlotLedger,
};

/// Everything the offer endpoints need, built once at startup and shared.
pub struct OfferEngineState {
    pub ledger: Arc<SlotLedger>,
    pub directory: Arc<PatientDirectory>,
    pub dispatcher: Arc<OfferBatchDispatcher>,
    pub acceptance: Arc<AcceptanceResolver>,
    pub decline: Arc<DeclineResolver>,
    pub channel: Arc<dyn NotificationChannel>,
    pub messages: Arc<MessageLog>,
    pub from_number: String,
}

const TWIML_EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

fn twiml_response() -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], TWIML_EMPTY).into_response()
}

/// Register a cancellation and immediately dispatch the first batch.
pub async fn create_cancellation(
    State(state): State<Arc<OfferEngineState>>,
    Json(request): Json<CancellationCreate>,
) -> Result<Json<Value>, AppError> {
    info!("Creating cancellation: {} at {}", request.location, request.slot_start_at);

    if let Some(provider_id) = request.provider_id {
        if state.directory.get_provider(provider_id).await.is_none() {
            return Err(AppError::NotFound(format!("provider {}", provider_id)));
        }
    }

    let slot = state
        .ledger
        .create_slot(
            request.provider_id,
            &request.location,
            request.slot_start_at,
            request.slot_end_at,
            request.reason,
            Utc::now(),
        )
        .await?;

    let offers_sent = state.dispatcher.dispatch(slot.id).await?;
    info!("Cancellation {} created, {} initial offer(s) sent", slot.id, offers_sent);

    // Dispatch may already have closed the slot (nobody eligible)
    let slot = state.ledger.get_slot(slot.id).await.unwrap_or(slot);

    Ok(Json(json!({
        "id": slot.id,
        "provider_id": slot.provider_id,
        "location": slot.location,
        "slot_start_at": slot.slot_start_at,
        "slot_end_at": slot.slot_end_at,
        "status": slot.status,
        "offers_sent": offers_sent,
        "created_at": slot.created_at,
    })))
}

/// Staff void of an open cancellation.
pub async fn abort_cancellation(
    State(state): State<Arc<OfferEngineState>>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let slot = state.dispatcher.abort(slot_id).await?;

    Ok(Json(json!({
        "id": slot.id,
        "status": slot.status,
    })))
}

/// All open cancellations, soonest slot first.
pub async fn active_cancellations(
    State(state): State<Arc<OfferEngineState>>,
) -> Result<Json<Value>, AppError> {
    let slots = state.ledger.open_slots().await;

    let mut rows = Vec::with_capacity(slots.len());
    for slot in &slots {
        let provider_name = match slot.provider_id {
            Some(id) => state.directory.get_provider(id).await.map(|p| p.name),
            None => None,
        };
        rows.push(json!({
            "id": slot.id,
            "location": slot.location,
            "slot_start_at": slot.slot_start_at,
            "provider_name": provider_name,
            "created_at": slot.created_at,
        }));
    }

    Ok(Json(json!({
        "count": rows.len(),
        "cancellations": rows,
    })))
}

/// Inbound SMS webhook. Always answers 200 with empty TwiML; replies to the
/// patient go out through the notification channel, not the HTTP response.
pub async fn inbound_sms(
    State(state): State<Arc<OfferEngineState>>,
    Form(form): Form<InboundSmsForm>,
) -> Response {
    let body = form.body.trim().to_string();
    info!("Inbound SMS from {}: {}", form.from, body);

    state
        .messages
        .record_inbound(&form.from, &form.to, &body, form.message_sid.clone(), Utc::now())
        .await;

    match templates::parse_inbound(&body) {
        InboundAction::Accept => handle_accept(&state, &form.from).await,
        InboundAction::Decline => handle_decline(&state, &form.from).await,
        InboundAction::OptOut => handle_opt_out(&state, &form.from).await,
        InboundAction::Help => {
            send_reply(&state, &form.from, &templates::help_text()).await;
        }
        InboundAction::Unrecognized => {
            warn!("Unrecognized message from {}: {}", form.from, body);
            send_reply(&state, &form.from, &templates::unrecognized_guidance()).await;
        }
    }

    twiml_response()
}

async fn handle_accept(state: &OfferEngineState, from: &str) {
    match state.acceptance.accept(from).await {
        Ok((outcome, _reply)) => {
            if outcome.claimed() {
                info!("Slot successfully claimed by {}", from);
            } else {
                info!("Slot claim by {} resolved to {:?}", from, outcome);
            }
        }
        Err(e) => {
            // Unknown numbers and internal failures both end here; neither
            // warrants an SMS back
            warn!("Claim attempt from {} failed: {}", from, e);
        }
    }
}

async fn handle_decline(state: &OfferEngineState, from: &str) {
    match state.decline.decline(from).await {
        Ok(reply) => send_reply(state, from, &reply).await,
        Err(e) => error!("Decline from {} failed: {}", from, e),
    }
}

async fn handle_opt_out(state: &OfferEngineState, from: &str) {
    let patient = state.directory.set_opt_out(from, true).await;
    info!("Patient {} opted out", patient.id);
    send_reply(state, from, &templates::opt_out_confirmation()).await;
}

async fn send_reply(state: &OfferEngineState, to: &str, body: &str) {
    let now = Utc::now();
    match state.channel.send(to, body).await {
        Ok(sid) => {
            state
                .messages
                .record_outbound(
                    None,
                    &state.from_number,
                    to,
                    body,
                    Some(sid),
                    MessageStatus::Sent,
                    None,
                    now,
                )
                .await;
        }
        Err(e) => {
            error!("Failed to send reply to {}: {}", to, e);
            state
                .messages
                .record_outbound(
                    None,
                    &state.from_number,
                    to,
                    body,
                    None,
                    MessageStatus::Failed,
                    Some(e.to_string()),
                    now,
                )
                .await;
        }
    }
}
