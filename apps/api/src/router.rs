use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use availability_cell::router::availability_routes;
use booking_cell::router::booking_routes;
use discount_cell::router::discount_routes;
use shared_config::AppConfig;
use subscription_cell::router::subscription_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic marketplace API is running!" }))
        .nest("/availability", availability_routes(state.clone()))
        .nest("/bookings", booking_routes(state.clone()))
        .nest("/discounts", discount_routes(state.clone()))
        .nest("/subscriptions", subscription_routes(state))
}
