// libs/booking-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn booking_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/cart", post(handlers::add_to_cart))
        .route("/cart/{patient_id}", get(handlers::list_cart))
        .route(
            "/cart/{patient_id}/{booking_id}",
            delete(handlers::remove_from_cart),
        )
        .route(
            "/cart/{patient_id}/{booking_id}/discount",
            post(handlers::apply_discount),
        )
        .route("/clinics/{clinic_id}/slots/check", get(handlers::check_slot))
        .route("/clinics/{clinic_id}/booked", get(handlers::booked_slots))
        .with_state(state)
}
