// libs/discount-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{ApplyDiscountRequest, CreateDiscountRequest};
use crate::services::DiscountLedger;

pub async fn create_discount(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<CreateDiscountRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let ledger = DiscountLedger::new(&state);
    let discount = ledger.create(clinic_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": discount
        })),
    ))
}

pub async fn list_discounts(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let ledger = DiscountLedger::new(&state);
    let discounts = ledger.list(clinic_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": discounts
    })))
}

pub async fn delete_discount(
    State(state): State<Arc<AppConfig>>,
    Path((clinic_id, discount_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    let ledger = DiscountLedger::new(&state);
    let discount = ledger.delete(clinic_id, discount_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": discount
    })))
}

pub async fn apply_discount(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<ApplyDiscountRequest>,
) -> Result<Json<Value>, AppError> {
    let ledger = DiscountLedger::new(&state);
    let applied = ledger.apply(clinic_id, &request.code, request.amount).await?;

    Ok(Json(json!({
        "success": true,
        "data": applied
    })))
}

pub async fn validate_discount(
    State(state): State<Arc<AppConfig>>,
    Path((clinic_id, code)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    let ledger = DiscountLedger::new(&state);
    let discount = ledger.validate(clinic_id, &code).await?;

    Ok(Json(json!({
        "success": true,
        "data": discount
    })))
}
