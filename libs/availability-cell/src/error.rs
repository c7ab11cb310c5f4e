use thiserror::Error;

use shared_models::error::AppError;

use crate::models::DayOfWeek;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AvailabilityError {
    #[error("Invalid day '{0}'. Expected one of: sunday, monday, tuesday, wednesday, thursday, friday, saturday")]
    InvalidDay(String),

    #[error("{0}")]
    InvalidTimeRange(String),

    #[error("No availability found for {0}")]
    DayNotFound(DayOfWeek),

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<AvailabilityError> for AppError {
    fn from(err: AvailabilityError) -> Self {
        match err {
            AvailabilityError::InvalidDay(_) | AvailabilityError::InvalidTimeRange(_) => {
                AppError::ValidationError(err.to_string())
            }
            AvailabilityError::DayNotFound(_) | AvailabilityError::ClinicNotFound => {
                AppError::NotFound(err.to_string())
            }
            AvailabilityError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
