use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{add_to_waitlist, boost_priority, get_waitlist, recalculate_priorities};
use crate::PatientDirectory;

pub fn create_waitlist_router(directory: Arc<PatientDirectory>) -> Router {
    Router::new()
        .route("/waitlist", post(add_to_waitlist).get(get_waitlist))
        .route("/waitlist/{patient_id}/boost", post(boost_priority))
        .route("/waitlist/recalculate", post(recalculate_priorities))
        .with_state(directory)
}
