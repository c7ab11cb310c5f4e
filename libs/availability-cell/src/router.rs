// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/{clinic_id}",
            get(handlers::get_week).put(handlers::set_availability),
        )
        .route("/{clinic_id}/slots", get(handlers::get_slots))
        .route("/{clinic_id}/{day}", delete(handlers::delete_day))
        .with_state(state)
}
