// libs/booking-cell/src/services/sources.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::error::BookingError;
use crate::models::{BookingStatus, HeldSlot};

/// Anything that can hold a clinic timeslot. The checker unions every
/// source's answer, so cart bookings and order line items compete for the
/// same slots.
#[async_trait]
pub trait BookingConflictSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Slot-holding bookings for the clinic that start in `[start, end)`.
    async fn active_bookings_between(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HeldSlot>, BookingError>;
}

#[derive(Debug, Deserialize)]
struct ScheduledRow {
    scheduled_at: DateTime<Utc>,
    #[serde(default)]
    ends_at: Option<DateTime<Utc>>,
}

pub struct CartBookingSource {
    supabase: Arc<SupabaseClient>,
}

impl CartBookingSource {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl BookingConflictSource for CartBookingSource {
    fn name(&self) -> &'static str {
        "cart_bookings"
    }

    async fn active_bookings_between(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HeldSlot>, BookingError> {
        let path = window_path("cart_bookings", "scheduled_at,ends_at", clinic_id, start, end);
        fetch_held(&self.supabase, &path, clinic_id, self.name()).await
    }
}

/// Order line items, read through the `order_tests` view that flattens each
/// order's embedded tests into rows.
pub struct OrderTestSource {
    supabase: Arc<SupabaseClient>,
}

impl OrderTestSource {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl BookingConflictSource for OrderTestSource {
    fn name(&self) -> &'static str {
        "order_tests"
    }

    async fn active_bookings_between(
        &self,
        clinic_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HeldSlot>, BookingError> {
        let path = window_path("order_tests", "scheduled_at", clinic_id, start, end);
        fetch_held(&self.supabase, &path, clinic_id, self.name()).await
    }
}

async fn fetch_held(
    supabase: &SupabaseClient,
    path: &str,
    clinic_id: Uuid,
    source: &str,
) -> Result<Vec<HeldSlot>, BookingError> {
    let rows: Vec<Value> = supabase
        .request(Method::GET, path, None)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

    let held = rows
        .into_iter()
        .map(serde_json::from_value::<ScheduledRow>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| BookingError::DatabaseError(format!("Failed to parse {}: {}", source, e)))?
        .into_iter()
        .map(|row| HeldSlot::new(row.scheduled_at, row.ends_at))
        .collect::<Vec<_>>();

    debug!("{} active {} row(s) for clinic {}", held.len(), source, clinic_id);
    Ok(held)
}

fn window_path(
    relation: &str,
    select: &str,
    clinic_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "/rest/v1/{}?clinic_id=eq.{}&status={}&scheduled_at=gte.{}&scheduled_at=lt.{}&select={}",
        relation,
        clinic_id,
        slot_holding_filter(),
        timestamp(start),
        timestamp(end),
        select
    )
}

/// PostgREST `in` filter over the statuses that hold a slot.
fn slot_holding_filter() -> String {
    let held: Vec<String> = BookingStatus::ALL
        .iter()
        .filter(|status| status.holds_slot())
        .map(ToString::to_string)
        .collect();
    format!("in.({})", held.join(","))
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
