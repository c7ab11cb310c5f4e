// libs/booking-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{AddToCartRequest, ApplyCartDiscountRequest, BookedSlotsQuery, SlotCheckQuery};
use crate::services::{CartService, SlotConflictChecker};

pub async fn add_to_cart(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = CartService::new(&state);
    let booking = service.add_to_cart(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": booking
        })),
    ))
}

pub async fn list_cart(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = CartService::new(&state);
    let cart = service.revalidate_cart(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": cart
    })))
}

pub async fn remove_from_cart(
    State(state): State<Arc<AppConfig>>,
    Path((patient_id, booking_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let service = CartService::new(&state);
    let cart = service.remove_from_cart(patient_id, booking_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": cart
    })))
}

pub async fn apply_discount(
    State(state): State<Arc<AppConfig>>,
    Path((patient_id, booking_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ApplyCartDiscountRequest>,
) -> Result<Json<Value>, AppError> {
    let service = CartService::new(&state);
    let booking = service.apply_discount(patient_id, booking_id, &request.code).await?;

    Ok(Json(json!({
        "success": true,
        "data": booking
    })))
}

pub async fn check_slot(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<SlotCheckQuery>,
) -> Result<Json<Value>, AppError> {
    let checker = SlotConflictChecker::new(&state);
    let reservation = checker.check_and_reserve(clinic_id, query.date, &query.time).await?;

    Ok(Json(json!({
        "success": true,
        "data": reservation,
        "message": "Slot is available"
    })))
}

pub async fn booked_slots(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<BookedSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let checker = SlotConflictChecker::new(&state);
    let slots = checker.booked_slots(clinic_id, query.date).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "date": query.date,
            "booked": slots
        }
    })))
}
