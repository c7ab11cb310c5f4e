// libs/availability-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{CatalogRepository, SupabaseClient};
use shared_utils::TimezoneResolver;

use crate::error::AvailabilityError;
use crate::models::{
    DatedAvailability, DayOfWeek, SetAvailabilityRequest, SlotsForDate, TimeRange,
    WeeklyAvailability,
};

const AVAILABILITY_TABLE: &str = "clinic_availability";
const MAX_HOUR: u32 = 23;

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    catalog: CatalogRepository,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            catalog: CatalogRepository::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    /// Replace a clinic's record for one weekday wholesale.
    pub async fn set_day(
        &self,
        clinic_id: Uuid,
        request: SetAvailabilityRequest,
    ) -> Result<WeeklyAvailability, AvailabilityError> {
        let day: DayOfWeek = request.day.parse()?;
        validate_time_ranges(&request.time_ranges)?;

        debug!("Setting {} availability for clinic {}", day, clinic_id);

        let record = json!({
            "clinic_id": clinic_id,
            "day": day,
            "time_ranges": request.time_ranges,
            "is_closed": request.is_closed,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows = self
            .supabase
            .upsert(AVAILABILITY_TABLE, "clinic_id,day", record)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        let saved = parse_first(rows)?
            .ok_or_else(|| AvailabilityError::DatabaseError("Failed to save availability".to_string()))?;

        info!("Availability for clinic {} on {} saved", clinic_id, day);
        Ok(saved)
    }

    pub async fn delete_day(&self, clinic_id: Uuid, day: &str) -> Result<(), AvailabilityError> {
        let day: DayOfWeek = day.parse()?;

        let path = format!(
            "/rest/v1/{}?clinic_id=eq.{}&day=eq.{}",
            AVAILABILITY_TABLE, clinic_id, day
        );
        let deleted = self
            .supabase
            .mutate(Method::DELETE, &path, None)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        if deleted.is_empty() {
            return Err(AvailabilityError::DayNotFound(day));
        }

        info!("Availability for clinic {} on {} deleted", clinic_id, day);
        Ok(())
    }

    /// Every configured weekday in insertion order (not weekday order).
    pub async fn get_week(&self, clinic_id: Uuid) -> Result<Vec<WeeklyAvailability>, AvailabilityError> {
        let path = format!(
            "/rest/v1/{}?clinic_id=eq.{}&order=created_at.asc",
            AVAILABILITY_TABLE, clinic_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        parse_all(rows)
    }

    pub async fn get_day(
        &self,
        clinic_id: Uuid,
        day: DayOfWeek,
    ) -> Result<Option<WeeklyAvailability>, AvailabilityError> {
        let path = format!(
            "/rest/v1/{}?clinic_id=eq.{}&day=eq.{}&limit=1",
            AVAILABILITY_TABLE, clinic_id, day
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?;

        parse_first(rows)
    }

    pub async fn get_slots_for_date(
        &self,
        clinic_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<SlotsForDate, AvailabilityError> {
        self.get_slots_for_date_at(clinic_id, date, Utc::now()).await
    }

    pub async fn get_slots_for_date_at(
        &self,
        clinic_id: Uuid,
        date: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> Result<SlotsForDate, AvailabilityError> {
        match date {
            Some(date) => {
                let day = DayOfWeek::from_weekday(date.weekday());
                let record = self.get_day(clinic_id, day).await?;
                if record.is_none() {
                    debug!("Clinic {} is not available on {} ({})", clinic_id, date, day);
                }
                Ok(SlotsForDate::Day(record))
            }
            None => {
                let tz = self.clinic_timezone(clinic_id).await?;
                let records = self.get_week(clinic_id).await?;
                let now_local = now.with_timezone(&tz).naive_local();
                Ok(SlotsForDate::Week(next_occurrences(records, now_local)))
            }
        }
    }

    pub async fn clinic_timezone(&self, clinic_id: Uuid) -> Result<Tz, AvailabilityError> {
        let clinic = self
            .catalog
            .get_clinic(clinic_id)
            .await
            .map_err(|e| AvailabilityError::DatabaseError(e.to_string()))?
            .ok_or(AvailabilityError::ClinicNotFound)?;

        Ok(TimezoneResolver::resolve(clinic.country.as_deref()))
    }
}

pub fn validate_time_ranges(ranges: &[TimeRange]) -> Result<(), AvailabilityError> {
    if ranges.is_empty() {
        return Err(AvailabilityError::InvalidTimeRange(
            "At least one time range is required".to_string(),
        ));
    }

    for range in ranges {
        if range.open_hour > MAX_HOUR || range.close_hour > MAX_HOUR {
            warn!("Rejected out-of-clock range {:?}", range);
            return Err(AvailabilityError::InvalidTimeRange(format!(
                "Hours must be between 0 and {}",
                MAX_HOUR
            )));
        }
        if range.open_hour >= range.close_hour {
            warn!("Rejected inverted range {:?}", range);
            return Err(AvailabilityError::InvalidTimeRange(format!(
                "Open hour ({}) must be before close hour ({})",
                range.open_hour, range.close_hour
            )));
        }
    }

    Ok(())
}

/// Pairs each record with the next date its weekday falls on, counting from
/// `now_local`. Today's record rolls over a week once its last range has closed.
pub fn next_occurrences(
    records: Vec<WeeklyAvailability>,
    now_local: NaiveDateTime,
) -> Vec<DatedAvailability> {
    let today = now_local.date();
    let today_index = DayOfWeek::from_weekday(today.weekday()).index();

    records
        .into_iter()
        .map(|availability| {
            let offset = (availability.day.index() + 7 - today_index) % 7;
            let mut date = today + Duration::days(i64::from(offset));

            let closed_for_today = availability
                .latest_close_hour()
                .is_some_and(|close| now_local.hour() >= close);
            if offset == 0 && closed_for_today {
                date += Duration::days(7);
            }

            DatedAvailability { date, availability }
        })
        .collect()
}

fn parse_all(rows: Vec<Value>) -> Result<Vec<WeeklyAvailability>, AvailabilityError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<WeeklyAvailability>, _>>()
        .map_err(|e| AvailabilityError::DatabaseError(format!("Failed to parse availability: {}", e)))
}

fn parse_first(rows: Vec<Value>) -> Result<Option<WeeklyAvailability>, AvailabilityError> {
    Ok(parse_all(rows)?.into_iter().next())
}
