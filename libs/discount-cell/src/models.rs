// libs/discount-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE DISCOUNT MODELS
// ==============================================================================

/// Stored as 0 (active) / 1 (expired). The flag is a cache of
/// `valid_until < now`, refreshed lazily by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DiscountStatus {
    Active,
    Expired,
}

impl From<DiscountStatus> for u8 {
    fn from(status: DiscountStatus) -> Self {
        match status {
            DiscountStatus::Active => 0,
            DiscountStatus::Expired => 1,
        }
    }
}

impl TryFrom<u8> for DiscountStatus {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DiscountStatus::Active),
            1 => Ok(DiscountStatus::Expired),
            other => Err(format!("unknown discount status {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub code: String,
    pub percentage: u8,
    pub valid_until: DateTime<Utc>,
    pub status: DiscountStatus,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_hidden: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == DiscountStatus::Active && !self.is_deleted && self.valid_until >= now
    }
}

/// Discount state embedded in a cart booking. Always mirrors the discount
/// that was valid at the last revalidation, or full price when none was.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartDiscountSnapshot {
    pub code: Option<String>,
    pub percentage: Option<u8>,
    pub discount_amount: f64,
    pub final_price: f64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CartDiscountSnapshot {
    pub fn full_price(price: f64) -> Self {
        Self {
            code: None,
            percentage: None,
            discount_amount: 0.0,
            final_price: price,
            expires_at: None,
        }
    }

    pub fn discounted(discount: &Discount, price: f64) -> Self {
        let discount_amount = discount_amount(price, discount.percentage);
        Self {
            code: Some(discount.code.clone()),
            percentage: Some(discount.percentage),
            discount_amount,
            final_price: price - discount_amount,
            expires_at: Some(discount.valid_until),
        }
    }

    pub fn has_discount(&self) -> bool {
        self.code.is_some()
    }
}

/// `amount * percentage / 100`, no currency rounding.
pub fn discount_amount(amount: f64, percentage: u8) -> f64 {
    amount * f64::from(percentage) / 100.0
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDiscountRequest {
    pub code: String,
    pub percentage: i32,
    pub valid_until: DateTime<Utc>,
    #[serde(default)]
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyDiscountRequest {
    pub code: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub code: String,
    pub percentage: u8,
    pub discount_amount: f64,
    pub final_price: f64,
    pub expires_at: DateTime<Utc>,
}

impl From<AppliedDiscount> for CartDiscountSnapshot {
    fn from(applied: AppliedDiscount) -> Self {
        Self {
            code: Some(applied.code),
            percentage: Some(applied.percentage),
            discount_amount: applied.discount_amount,
            final_price: applied.final_price,
            expires_at: Some(applied.expires_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountCreatedEvent {
    pub clinic_id: Uuid,
    pub discount: Discount,
}
