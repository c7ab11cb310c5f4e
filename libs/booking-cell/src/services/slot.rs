// libs/booking-cell/src/services/slot.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::BookingError;

/// An hour of the local clock, the atomic bookable unit of a clinic-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourMarker(u32);

impl HourMarker {
    pub fn from_hour(hour: u32) -> Option<Self> {
        (hour < 24).then_some(Self(hour))
    }

    /// The marker an instant falls in, read off the clinic's wall clock.
    pub fn of_instant(instant: DateTime<Utc>, tz: Tz) -> Self {
        Self(instant.with_timezone(&tz).hour())
    }

    pub fn hour(&self) -> u32 {
        self.0
    }

    /// Zero-padded key used for occupancy comparison, e.g. `02PM`.
    pub fn label(&self) -> String {
        format!("{:02}{}", self.twelve_hour(), self.meridiem())
    }

    fn twelve_hour(&self) -> u32 {
        match self.0 % 12 {
            0 => 12,
            h => h,
        }
    }

    fn meridiem(&self) -> &'static str {
        if self.0 < 12 {
            "AM"
        } else {
            "PM"
        }
    }
}

impl fmt::Display for HourMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.twelve_hour(), self.meridiem())
    }
}

impl FromStr for HourMarker {
    type Err = BookingError;

    /// `12AM` is 0, `12PM` is 12, otherwise PM adds 12.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BookingError::InvalidTimeFormat(s.to_string());

        let upper = s.trim().to_uppercase();
        let (digits, is_pm) = if let Some(rest) = upper.strip_suffix("PM") {
            (rest.trim_end(), true)
        } else if let Some(rest) = upper.strip_suffix("AM") {
            (rest.trim_end(), false)
        } else {
            return Err(invalid());
        };

        if digits.is_empty() || digits.len() > 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour: u32 = digits.parse().map_err(|_| invalid())?;
        let hour24 = match (hour, is_pm) {
            (1..=11, false) => hour,
            (12, false) => 0,
            (12, true) => 12,
            (1..=11, true) => hour + 12,
            _ => return Err(invalid()),
        };

        Ok(Self(hour24))
    }
}

/// A requested time: a single hour, or a start-end range of hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Single(HourMarker),
    Range { start: HourMarker, end: HourMarker },
}

impl TimeSpec {
    pub fn start(&self) -> HourMarker {
        match self {
            TimeSpec::Single(marker) => *marker,
            TimeSpec::Range { start, .. } => *start,
        }
    }

    /// Every hour the request would occupy: the hour itself, or `[start, end)`.
    pub fn hours(&self) -> Vec<HourMarker> {
        match self {
            TimeSpec::Single(marker) => vec![*marker],
            TimeSpec::Range { start, end } => (start.hour()..end.hour())
                .filter_map(HourMarker::from_hour)
                .collect(),
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Single(marker) => write!(f, "{}", marker),
            TimeSpec::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

impl FromStr for TimeSpec {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(single), None, None) => Ok(TimeSpec::Single(single.parse()?)),
            (Some(start), Some(end), None) => {
                let start: HourMarker = start.parse()?;
                let end: HourMarker = end.parse()?;
                if end <= start {
                    return Err(BookingError::InvalidTimeFormat(s.to_string()));
                }
                Ok(TimeSpec::Range { start, end })
            }
            _ => Err(BookingError::InvalidTimeFormat(s.to_string())),
        }
    }
}

/// The absolute instant of `hour:00` on `date` in the clinic's timezone.
/// Hours skipped by a DST jump are rejected.
pub fn local_instant(tz: Tz, date: NaiveDate, hour: HourMarker) -> Result<DateTime<Utc>, BookingError> {
    let naive = date
        .and_hms_opt(hour.hour(), 0, 0)
        .ok_or_else(|| BookingError::InvalidTimeFormat(hour.to_string()))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| BookingError::NonexistentLocalTime(format!("{} {}", date, hour)))
}

/// `[start, end)` of the local calendar day as UTC instants.
pub fn local_day_bounds(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight(tz, date);
    let end = date
        .succ_opt()
        .map(|next| local_midnight(tz, next))
        .unwrap_or(start + chrono::Duration::days(1));
    (start, end)
}

fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let naive = NaiveDateTime::new(date, NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .with_timezone(&Utc)
}
