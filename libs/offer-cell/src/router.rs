use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    abort_cancellation, active_cancellations, create_cancellation, inbound_sms, OfferEngineState,
};

pub fn create_offer_router(state: Arc<OfferEngineState>) -> Router {
    Router::new()
        .route("/sms/inbound", post(inbound_sms))
        .route("/admin/cancellations", post(create_cancellation))
        .route("/admin/cancellations/active", get(active_cancellations))
        .route("/admin/cancellations/{slot_id}/abort", post(abort_cancellation))
        .with_state(state)
}
