// libs/availability-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AvailabilityError;

// ==============================================================================
// WEEKDAY
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Sunday,
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Sunday => "sunday",
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => DayOfWeek::Sunday,
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
        }
    }

    /// Days since Sunday, 0..=6.
    pub fn index(&self) -> u32 {
        match self {
            DayOfWeek::Sunday => 0,
            DayOfWeek::Monday => 1,
            DayOfWeek::Tuesday => 2,
            DayOfWeek::Wednesday => 3,
            DayOfWeek::Thursday => 4,
            DayOfWeek::Friday => 5,
            DayOfWeek::Saturday => 6,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = AvailabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        DayOfWeek::ALL
            .iter()
            .copied()
            .find(|day| day.as_str() == normalized)
            .ok_or_else(|| AvailabilityError::InvalidDay(s.to_string()))
    }
}

// ==============================================================================
// WEEKLY AVAILABILITY
// ==============================================================================

/// Opening window in local-clock hours; `close_hour` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl TimeRange {
    pub fn new(open_hour: u32, close_hour: u32) -> Self {
        Self { open_hour, close_hour }
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        self.open_hour <= hour && hour < self.close_hour
    }

    pub fn contains_span(&self, start_hour: u32, end_hour: u32) -> bool {
        self.open_hour <= start_hour && end_hour <= self.close_hour
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub id: Option<Uuid>,
    pub clinic_id: Uuid,
    pub day: DayOfWeek,
    pub time_ranges: Vec<TimeRange>,
    pub is_closed: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WeeklyAvailability {
    pub fn accepts_hour(&self, hour: u32) -> bool {
        !self.is_closed && self.time_ranges.iter().any(|range| range.contains_hour(hour))
    }

    pub fn accepts_span(&self, start_hour: u32, end_hour: u32) -> bool {
        !self.is_closed
            && self
                .time_ranges
                .iter()
                .any(|range| range.contains_span(start_hour, end_hour))
    }

    pub fn latest_close_hour(&self) -> Option<u32> {
        self.time_ranges.iter().map(|range| range.close_hour).max()
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    pub day: String,
    pub time_ranges: Vec<TimeRange>,
    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<NaiveDate>,
}

/// A weekly record paired with the next calendar date it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedAvailability {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub availability: WeeklyAvailability,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SlotsForDate {
    /// No date requested: every configured weekday with its next occurrence.
    Week(Vec<DatedAvailability>),
    /// A specific date; `None` when the clinic has nothing for that weekday.
    Day(Option<WeeklyAvailability>),
}
