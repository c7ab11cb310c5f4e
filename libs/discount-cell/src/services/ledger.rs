// libs/discount-cell/src/services/ledger.rs
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{SupabaseClient, SupabaseError};

use crate::error::DiscountError;
use crate::models::{
    AppliedDiscount, CartDiscountSnapshot, CreateDiscountRequest, Discount, DiscountCreatedEvent,
    discount_amount,
};
use crate::services::events::{DiscountEventPublisher, TracingDiscountPublisher};

const DISCOUNTS_PATH: &str = "/rest/v1/discounts";

/// Discount code lifecycle for a clinic. Expiry is detected lazily: every
/// read or apply path sweeps the clinic's stale codes before looking.
pub struct DiscountLedger {
    supabase: Arc<SupabaseClient>,
    publisher: Arc<dyn DiscountEventPublisher>,
}

impl DiscountLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self::with_publisher(supabase, Arc::new(TracingDiscountPublisher))
    }

    pub fn with_publisher(
        supabase: Arc<SupabaseClient>,
        publisher: Arc<dyn DiscountEventPublisher>,
    ) -> Self {
        Self { supabase, publisher }
    }

    pub async fn create(
        &self,
        clinic_id: Uuid,
        request: CreateDiscountRequest,
    ) -> Result<Discount, DiscountError> {
        let code = normalize_code(&request.code)?;
        let percentage = validate_percentage(request.percentage)?;

        if self.find_undeleted(clinic_id, &code).await?.is_some() {
            warn!("Duplicate discount code {} for clinic {}", code, clinic_id);
            return Err(DiscountError::DuplicateCode(code));
        }

        let body = json!({
            "clinic_id": clinic_id,
            "code": code,
            "percentage": percentage,
            "valid_until": timestamp(request.valid_until),
            "status": 0,
            "is_deleted": false,
            "is_hidden": request.is_hidden,
        });

        // The partial unique index on (clinic_id, code) catches a racing insert.
        let rows = self
            .supabase
            .mutate(Method::POST, DISCOUNTS_PATH, Some(body))
            .await
            .map_err(|e| {
                if SupabaseError::is_conflict(&e) {
                    DiscountError::DuplicateCode(code.clone())
                } else {
                    DiscountError::DatabaseError(e.to_string())
                }
            })?;

        let discount = parse_first(rows)?
            .ok_or_else(|| DiscountError::DatabaseError("Failed to create discount".to_string()))?;

        info!("Discount {} ({}%) created for clinic {}", discount.code, discount.percentage, clinic_id);

        if !discount.is_hidden {
            self.publish_created(DiscountCreatedEvent {
                clinic_id,
                discount: discount.clone(),
            });
        }

        Ok(discount)
    }

    pub async fn sweep_expired(&self, clinic_id: Uuid) -> Result<usize, DiscountError> {
        self.sweep_expired_at(clinic_id, Utc::now()).await
    }

    /// Flip every active discount whose `valid_until` has passed to expired.
    pub async fn sweep_expired_at(
        &self,
        clinic_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<usize, DiscountError> {
        let path = format!(
            "{}?clinic_id=eq.{}&status=eq.0&valid_until=lt.{}",
            DISCOUNTS_PATH,
            clinic_id,
            timestamp(now)
        );

        let expired = self
            .supabase
            .mutate(Method::PATCH, &path, Some(json!({ "status": 1 })))
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        if !expired.is_empty() {
            info!("Expired {} discount(s) for clinic {}", expired.len(), clinic_id);
        }

        Ok(expired.len())
    }

    pub async fn apply(
        &self,
        clinic_id: Uuid,
        code: &str,
        amount: f64,
    ) -> Result<AppliedDiscount, DiscountError> {
        self.apply_at(clinic_id, code, amount, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        clinic_id: Uuid,
        code: &str,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<AppliedDiscount, DiscountError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(DiscountError::ValidationError(
                "Amount must be a non-negative number".to_string(),
            ));
        }

        self.sweep_expired_at(clinic_id, now).await?;

        if self.count_active(clinic_id, now).await? == 0 {
            warn!("Discount {} requested but clinic {} has no active discounts", code, clinic_id);
            return Err(DiscountError::NoActiveDiscounts);
        }

        let discount = self
            .find_valid(clinic_id, &code.trim().to_uppercase(), now)
            .await?
            .ok_or(DiscountError::InvalidCode)?;

        let off = discount_amount(amount, discount.percentage);
        debug!("Applied {} ({}%) to {}: -{}", discount.code, discount.percentage, amount, off);

        Ok(AppliedDiscount {
            code: discount.code,
            percentage: discount.percentage,
            discount_amount: off,
            final_price: amount - off,
            expires_at: discount.valid_until,
        })
    }

    /// Look up a usable code without pricing anything.
    pub async fn validate(&self, clinic_id: Uuid, code: &str) -> Result<Discount, DiscountError> {
        let now = Utc::now();
        self.sweep_expired_at(clinic_id, now).await?;

        self.find_valid(clinic_id, &code.trim().to_uppercase(), now)
            .await?
            .ok_or(DiscountError::InvalidCode)
    }

    pub async fn list(&self, clinic_id: Uuid) -> Result<Vec<Discount>, DiscountError> {
        self.sweep_expired(clinic_id).await?;

        let path = format!(
            "{}?clinic_id=eq.{}&is_deleted=eq.false&order=created_at.desc",
            DISCOUNTS_PATH, clinic_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        parse_all(rows)
    }

    /// Soft delete; discounts are never removed from storage.
    pub async fn delete(&self, clinic_id: Uuid, discount_id: Uuid) -> Result<Discount, DiscountError> {
        let path = format!(
            "{}?id=eq.{}&clinic_id=eq.{}&is_deleted=eq.false",
            DISCOUNTS_PATH, discount_id, clinic_id
        );

        let rows = self
            .supabase
            .mutate(Method::PATCH, &path, Some(json!({ "is_deleted": true })))
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        let discount = parse_first(rows)?.ok_or(DiscountError::NotFound)?;
        info!("Discount {} deleted for clinic {}", discount.code, clinic_id);
        Ok(discount)
    }

    /// Recompute a booking's discount snapshot against current discount state
    /// and the booking's current price. Never fails on an invalid code; the
    /// snapshot silently falls back to full price.
    pub async fn revalidate(
        &self,
        clinic_id: Uuid,
        price: f64,
        snapshot: &CartDiscountSnapshot,
    ) -> Result<CartDiscountSnapshot, DiscountError> {
        self.revalidate_at(clinic_id, price, snapshot, Utc::now()).await
    }

    pub async fn revalidate_at(
        &self,
        clinic_id: Uuid,
        price: f64,
        snapshot: &CartDiscountSnapshot,
        now: DateTime<Utc>,
    ) -> Result<CartDiscountSnapshot, DiscountError> {
        self.sweep_expired_at(clinic_id, now).await?;

        let Some(code) = snapshot.code.as_deref() else {
            return Ok(CartDiscountSnapshot::full_price(price));
        };

        match self.find_valid(clinic_id, code, now).await? {
            Some(discount) => Ok(CartDiscountSnapshot::discounted(&discount, price)),
            None => {
                debug!("Discount {} no longer valid for clinic {}, resetting to full price", code, clinic_id);
                Ok(CartDiscountSnapshot::full_price(price))
            }
        }
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn find_undeleted(&self, clinic_id: Uuid, code: &str) -> Result<Option<Discount>, DiscountError> {
        let path = format!(
            "{}?clinic_id=eq.{}&code=eq.{}&is_deleted=eq.false&limit=1",
            DISCOUNTS_PATH,
            clinic_id,
            urlencoding::encode(code)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        parse_first(rows)
    }

    async fn find_valid(
        &self,
        clinic_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Discount>, DiscountError> {
        let path = format!(
            "{}?clinic_id=eq.{}&code=eq.{}&status=eq.0&is_deleted=eq.false&valid_until=gte.{}&limit=1",
            DISCOUNTS_PATH,
            clinic_id,
            urlencoding::encode(code),
            timestamp(now)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        Ok(parse_first(rows)?.filter(|discount| discount.is_usable_at(now)))
    }

    async fn count_active(&self, clinic_id: Uuid, now: DateTime<Utc>) -> Result<usize, DiscountError> {
        let path = format!(
            "{}?clinic_id=eq.{}&status=eq.0&is_deleted=eq.false&valid_until=gte.{}&select=id",
            DISCOUNTS_PATH,
            clinic_id,
            timestamp(now)
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| DiscountError::DatabaseError(e.to_string()))?;

        Ok(rows.len())
    }

    fn publish_created(&self, event: DiscountCreatedEvent) {
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.discount_created(&event).await {
                error!("Failed to publish discount {} for clinic {}: {}", event.discount.code, event.clinic_id, e);
            }
        });
    }
}

fn normalize_code(code: &str) -> Result<String, DiscountError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(DiscountError::ValidationError("Discount code is required".to_string()));
    }
    Ok(code)
}

fn validate_percentage(percentage: i32) -> Result<u8, DiscountError> {
    match u8::try_from(percentage) {
        Ok(value) if (1..=100).contains(&value) => Ok(value),
        _ => Err(DiscountError::ValidationError(
            "Percentage must be between 1 and 100".to_string(),
        )),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_all(rows: Vec<Value>) -> Result<Vec<Discount>, DiscountError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Discount>, _>>()
        .map_err(|e| DiscountError::DatabaseError(format!("Failed to parse discounts: {}", e)))
}

fn parse_first(rows: Vec<Value>) -> Result<Option<Discount>, DiscountError> {
    Ok(parse_all(rows)?.into_iter().next())
}
