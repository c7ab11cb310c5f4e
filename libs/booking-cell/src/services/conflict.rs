// libs/booking-cell/src/services/conflict.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use futures::future::try_join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::{AvailabilityService, DayOfWeek, WeeklyAvailability};
use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::error::BookingError;
use crate::models::{slot_key, SlotReservation};
use crate::services::slot::{local_day_bounds, local_instant, HourMarker, TimeSpec};
use crate::services::sources::{BookingConflictSource, CartBookingSource, OrderTestSource};

/// Decides whether a requested clinic slot is open and unoccupied.
///
/// Occupancy is hour-grained: a booking holds every local hour it touches,
/// whatever its minute, and a request conflicts when any hour it would occupy
/// is already held on the same local day. A range `1PM-3PM` occupies 1PM and 2PM.
pub struct SlotConflictChecker {
    availability: AvailabilityService,
    sources: Vec<Arc<dyn BookingConflictSource>>,
}

impl SlotConflictChecker {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        let sources: Vec<Arc<dyn BookingConflictSource>> = vec![
            Arc::new(CartBookingSource::new(Arc::clone(&supabase))),
            Arc::new(OrderTestSource::new(Arc::clone(&supabase))),
        ];
        Self::with_sources(AvailabilityService::with_client(supabase), sources)
    }

    pub fn with_sources(
        availability: AvailabilityService,
        sources: Vec<Arc<dyn BookingConflictSource>>,
    ) -> Self {
        Self { availability, sources }
    }

    /// Validate `time_spec` on `local_date` against the clinic's hours and
    /// existing bookings. Nothing is written; the caller creates the booking
    /// at the returned instant.
    pub async fn check_and_reserve(
        &self,
        clinic_id: Uuid,
        local_date: NaiveDate,
        time_spec: &str,
    ) -> Result<SlotReservation, BookingError> {
        let spec: TimeSpec = time_spec.parse()?;
        let tz = self.availability.clinic_timezone(clinic_id).await?;

        let scheduled_at = local_instant(tz, local_date, spec.start())?;
        let day = DayOfWeek::from_weekday(scheduled_at.with_timezone(&tz).weekday());

        debug!(
            "Checking {} on {} ({}) for clinic {} in {}",
            spec, local_date, day, clinic_id, tz
        );

        let availability = self.availability.get_day(clinic_id, day).await?;
        ensure_open(availability.as_ref(), day, &spec)?;

        let marker = spec.start();
        let ends_at = match spec {
            TimeSpec::Single(_) => scheduled_at + Duration::hours(1),
            TimeSpec::Range { end, .. } => local_instant(tz, local_date, end)?,
        };

        let occupied = self.occupied_hours(clinic_id, tz, local_date).await?;
        if let Some(taken) = spec.hours().into_iter().find(|hour| occupied.contains(hour)) {
            warn!("Slot {} on {} already taken at clinic {}", taken, local_date, clinic_id);
            return Err(BookingError::SlotTaken {
                time: taken.to_string(),
                date: local_date,
            });
        }

        info!("Slot {} on {} is free at clinic {}", spec, local_date, clinic_id);

        Ok(SlotReservation {
            scheduled_at,
            ends_at,
            day_of_week: day,
            local_date,
            hour_marker: marker.label(),
            timezone: tz.name().to_string(),
            slot_key: slot_key(clinic_id, local_date, &marker.label()),
        })
    }

    /// Occupied hour markers for a clinic-day, in clock order.
    pub async fn booked_slots(
        &self,
        clinic_id: Uuid,
        local_date: NaiveDate,
    ) -> Result<Vec<String>, BookingError> {
        let tz = self.availability.clinic_timezone(clinic_id).await?;
        let markers = self.occupied_hours(clinic_id, tz, local_date).await?;

        let mut markers: Vec<HourMarker> = markers.into_iter().collect();
        markers.sort();
        Ok(markers.iter().map(HourMarker::label).collect())
    }

    async fn occupied_hours(
        &self,
        clinic_id: Uuid,
        tz: Tz,
        local_date: NaiveDate,
    ) -> Result<HashSet<HourMarker>, BookingError> {
        let (start, end) = local_day_bounds(tz, local_date);

        let per_source = try_join_all(
            self.sources
                .iter()
                .map(|source| source.active_bookings_between(clinic_id, start, end)),
        )
        .await?;

        for (source, found) in self.sources.iter().zip(&per_source) {
            debug!("{}: {} booking(s) on {}", source.name(), found.len(), local_date);
        }

        Ok(per_source
            .into_iter()
            .flatten()
            .flat_map(|held| held.hour_starts())
            .map(|instant| HourMarker::of_instant(instant, tz))
            .collect())
    }
}

/// The clinic must have an open record for `day` and some range must cover
/// the request: `open <= hour < close` for a single hour, `open <= start` and
/// `end <= close` for a range.
pub fn ensure_open(
    availability: Option<&WeeklyAvailability>,
    day: DayOfWeek,
    spec: &TimeSpec,
) -> Result<(), BookingError> {
    let availability = availability.ok_or(BookingError::DayUnavailable(day))?;
    if availability.is_closed {
        return Err(BookingError::ClinicClosed(day));
    }

    let covered = match spec {
        TimeSpec::Single(marker) => availability.accepts_hour(marker.hour()),
        TimeSpec::Range { start, end } => availability.accepts_span(start.hour(), end.hour()),
    };

    if !covered {
        return Err(BookingError::OutsideAvailability {
            time: spec.to_string(),
            day,
        });
    }

    Ok(())
}
