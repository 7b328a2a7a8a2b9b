use std::sync::Arc;

use axum::{routing::get, Router};

use offer_cell::{create_offer_router, OfferEngineState};
use waitlist_cell::{create_waitlist_router, PatientDirectory};

pub fn create_router(engine: Arc<OfferEngineState>, directory: Arc<PatientDirectory>) -> Router {
    Router::new()
        .route("/", get(|| async { "Waitlist backfill API is running!" }))
        .route("/health", get(|| async { "ok" }))
        .merge(create_offer_router(engine))
        .nest("/admin", create_waitlist_router(directory))
}
