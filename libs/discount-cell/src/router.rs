// libs/discount-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn discount_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/{clinic_id}",
            get(handlers::list_discounts).post(handlers::create_discount),
        )
        .route("/{clinic_id}/apply", post(handlers::apply_discount))
        .route("/{clinic_id}/validate/{code}", get(handlers::validate_discount))
        .route("/{clinic_id}/codes/{discount_id}", delete(handlers::delete_discount))
        .with_state(state)
}
