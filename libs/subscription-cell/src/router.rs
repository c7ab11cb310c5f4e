// libs/subscription-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn subscription_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/claims/{clinic_id}", post(handlers::record_claim))
        .route("/{patient_id}/eligibility", get(handlers::check_eligibility))
        .route("/{patient_id}/usage", post(handlers::record_usage))
        .route("/{patient_id}/spending", get(handlers::get_monthly_spend))
        .route("/{patient_id}/claims", get(handlers::list_claims))
        .with_state(state)
}
