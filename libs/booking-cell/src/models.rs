// libs/booking-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use availability_cell::DayOfWeek;
use discount_cell::CartDiscountSnapshot;

// ==============================================================================
// BOOKING MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Booked,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Booked,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    /// Pending and booked entries hold their slot.
    pub fn holds_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Booked)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Booked => write!(f, "booked"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A standalone booking sitting in a patient's cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartBooking {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub test_id: Uuid,
    pub test_name: String,
    pub price: f64,
    pub scheduled_at: DateTime<Utc>,
    /// Exclusive end of the held time. Empty means one hour.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    pub slot_key: String,
    pub status: BookingStatus,
    pub discount: CartDiscountSnapshot,
    pub created_at: Option<DateTime<Utc>>,
}

/// Clinic time held by one existing booking, `[starts_at, ends_at)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldSlot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl HeldSlot {
    pub fn new(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> Self {
        let ends_at = ends_at
            .filter(|end| *end > starts_at)
            .unwrap_or(starts_at + Duration::hours(1));
        Self { starts_at, ends_at }
    }

    pub fn single_hour(starts_at: DateTime<Utc>) -> Self {
        Self::new(starts_at, None)
    }

    /// Start instant of every clock hour the booking touches.
    pub fn hour_starts(&self) -> Vec<DateTime<Utc>> {
        let mut hours = Vec::new();
        let mut at = self.starts_at;
        while at < self.ends_at {
            hours.push(at);
            at += Duration::hours(1);
        }
        hours
    }
}

/// Outcome of a successful slot check: where the booking lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotReservation {
    pub scheduled_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub day_of_week: DayOfWeek,
    pub local_date: NaiveDate,
    pub hour_marker: String,
    pub timezone: String,
    pub slot_key: String,
}

impl SlotReservation {
    pub fn held(&self) -> HeldSlot {
        HeldSlot::new(self.scheduled_at, Some(self.ends_at))
    }
}

pub fn slot_key(clinic_id: Uuid, local_date: NaiveDate, hour_label: &str) -> String {
    format!("{}|{}|{}", clinic_id, local_date, hour_label)
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub test_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    pub discount_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyCartDiscountRequest {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotCheckQuery {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookedSlotsQuery {
    pub date: NaiveDate,
}
