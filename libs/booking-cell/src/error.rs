use chrono::NaiveDate;
use thiserror::Error;

use availability_cell::{AvailabilityError, DayOfWeek};
use discount_cell::DiscountError;
use shared_models::error::AppError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid time format '{0}'. Use an hour like 2PM or a range like 1PM-3PM")]
    InvalidTimeFormat(String),

    #[error("{0} does not exist in the clinic's timezone")]
    NonexistentLocalTime(String),

    #[error("Clinic is not available on {0}")]
    DayUnavailable(DayOfWeek),

    #[error("Clinic is closed on {0}")]
    ClinicClosed(DayOfWeek),

    #[error("Clinic is not available at {time} on {day}")]
    OutsideAvailability { time: String, day: DayOfWeek },

    #[error("The {time} slot on {date} is already booked")]
    SlotTaken { time: String, date: NaiveDate },

    #[error("Test not found")]
    TestNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error(transparent)]
    Availability(#[from] AvailabilityError),

    #[error(transparent)]
    Discount(#[from] DiscountError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::InvalidTimeFormat(_) | BookingError::NonexistentLocalTime(_) => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::DayUnavailable(_)
            | BookingError::ClinicClosed(_)
            | BookingError::OutsideAvailability { .. }
            | BookingError::SlotTaken { .. } => AppError::Conflict(err.to_string()),
            BookingError::TestNotFound | BookingError::BookingNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::Availability(inner) => inner.into(),
            BookingError::Discount(inner) => inner.into(),
            BookingError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
