// libs/subscription-cell/src/handlers.rs
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

use crate::models::{RecordClaimRequest, SpendingQuery};
use crate::services::PrivilegeService;

pub async fn check_eligibility(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PrivilegeService::new(&state);
    let subscription = service.can_use(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": subscription,
        "message": "Subscription can be used"
    })))
}

pub async fn record_usage(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PrivilegeService::new(&state);
    let subscription = service.record_test_usage(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": subscription
    })))
}

pub async fn get_monthly_spend(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<SpendingQuery>,
) -> Result<Json<Value>, AppError> {
    let service = PrivilegeService::new(&state);
    let spending = service.monthly_spend(patient_id, query.month.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "data": spending
    })))
}

pub async fn list_claims(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PrivilegeService::new(&state);
    let claims = service.list_claims(patient_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": claims
    })))
}

pub async fn record_claim(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<RecordClaimRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PrivilegeService::new(&state);
    let receipt = service
        .record_claim(clinic_id, request.patient_id, request.test_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "data": receipt
        })),
    ))
}
