use chrono::{DateTime, Utc};
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubscriptionError {
    #[error("No active subscription found")]
    SubscriptionNotFound,

    #[error("No active premium subscription found")]
    PremiumNotFound,

    #[error("Test not found")]
    TestNotFound,

    #[error("Subscription will be usable in {0} hour(s)")]
    ActivationPending(i64),

    #[error("You can take your next test on {}", .0.format("%Y-%m-%d"))]
    TestIntervalNotElapsed(DateTime<Utc>),

    #[error("Monthly test quota exhausted")]
    QuotaExhausted,

    #[error("You can make your next claim on {}", .0.format("%Y-%m-%d"))]
    ClaimCooldown(DateTime<Utc>),

    #[error("Insufficient privilege balance: {balance} available, {required} required")]
    InsufficientPrivilege { balance: f64, required: f64 },

    #[error("Subscription was modified by another request, please retry")]
    ConcurrentUpdate,

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Claim partially recorded: {0}")]
    PartialClaim(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::SubscriptionNotFound
            | SubscriptionError::PremiumNotFound
            | SubscriptionError::TestNotFound => AppError::NotFound(err.to_string()),
            SubscriptionError::ActivationPending(_)
            | SubscriptionError::TestIntervalNotElapsed(_)
            | SubscriptionError::QuotaExhausted
            | SubscriptionError::ClaimCooldown(_) => AppError::Forbidden(err.to_string()),
            SubscriptionError::InsufficientPrivilege { .. } => {
                AppError::PaymentRequired(err.to_string())
            }
            SubscriptionError::ConcurrentUpdate => AppError::Conflict(err.to_string()),
            SubscriptionError::InvalidMonth(_) => AppError::ValidationError(err.to_string()),
            SubscriptionError::PartialClaim(msg) => AppError::Internal(msg),
            SubscriptionError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
