// libs/availability-cell/src/handlers.rs
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

use crate::models::{SetAvailabilityRequest, SlotsForDate, SlotsQuery};
use crate::services::AvailabilityService;

pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let availability = service.set_day(clinic_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "data": availability
    })))
}

pub async fn get_week(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let week = service.get_week(clinic_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": week
    })))
}

pub async fn delete_day(
    State(state): State<Arc<AppConfig>>,
    Path((clinic_id, day)): Path<(Uuid, String)>,
) -> Result<StatusCode, AppError> {
    let service = AvailabilityService::new(&state);
    service.delete_day(clinic_id, &day).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_slots(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);
    let slots = service.get_slots_for_date(clinic_id, query.date).await?;

    let message = match &slots {
        SlotsForDate::Day(None) => Some("Clinic is not available on this day"),
        _ => None,
    };

    Ok(Json(json!({
        "success": true,
        "data": slots,
        "message": message
    })))
}
