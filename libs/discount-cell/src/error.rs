use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiscountError {
    #[error("Discount code '{0}' already exists for this clinic")]
    DuplicateCode(String),

    #[error("Invalid discount code")]
    InvalidCode,

    #[error("No active discounts available for this clinic")]
    NoActiveDiscounts,

    #[error("Discount not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DiscountError> for AppError {
    fn from(err: DiscountError) -> Self {
        match err {
            DiscountError::DuplicateCode(_) => AppError::Conflict(err.to_string()),
            DiscountError::InvalidCode => AppError::ValidationError(err.to_string()),
            DiscountError::ValidationError(msg) => AppError::ValidationError(msg),
            DiscountError::NoActiveDiscounts => AppError::BusinessRule(err.to_string()),
            DiscountError::NotFound => AppError::NotFound(err.to_string()),
            DiscountError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
