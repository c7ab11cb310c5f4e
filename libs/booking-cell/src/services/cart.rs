// libs/booking-cell/src/services/cart.rs
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use discount_cell::{CartDiscountSnapshot, DiscountLedger};
use shared_config::AppConfig;
use shared_database::{CatalogRepository, SupabaseClient, SupabaseError};

use crate::error::BookingError;
use crate::models::{AddToCartRequest, BookingStatus, CartBooking, SlotReservation};
use crate::services::conflict::SlotConflictChecker;

const CART_PATH: &str = "/rest/v1/cart_bookings";

/// Cart mutations. Every add, remove and explicit apply ends with the
/// patient's pending bookings revalidated against current discount state.
pub struct CartService {
    supabase: Arc<SupabaseClient>,
    checker: SlotConflictChecker,
    ledger: DiscountLedger,
    catalog: CatalogRepository,
}

impl CartService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self {
            checker: SlotConflictChecker::with_client(Arc::clone(&supabase)),
            ledger: DiscountLedger::with_client(Arc::clone(&supabase)),
            catalog: CatalogRepository::new(Arc::clone(&supabase)),
            supabase,
        }
    }

    pub async fn add_to_cart(&self, request: AddToCartRequest) -> Result<CartBooking, BookingError> {
        info!(
            "Adding test {} at clinic {} to cart of patient {}",
            request.test_id, request.clinic_id, request.patient_id
        );

        let test = self
            .catalog
            .get_lab_test(request.test_id)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?
            .filter(|test| test.clinic_id == request.clinic_id)
            .ok_or(BookingError::TestNotFound)?;

        let reservation = self
            .checker
            .check_and_reserve(request.clinic_id, request.date, &request.time)
            .await?;

        let snapshot = match request.discount_code.as_deref() {
            Some(code) => self.ledger.apply(request.clinic_id, code, test.price).await?.into(),
            None => CartDiscountSnapshot::full_price(test.price),
        };

        let booking = self
            .insert_booking(&request, &test.name, test.price, &reservation, &snapshot)
            .await?;

        let cart = self.revalidate_cart(request.patient_id).await?;
        Ok(cart.into_iter().find(|b| b.id == booking.id).unwrap_or(booking))
    }

    pub async fn remove_from_cart(&self, patient_id: Uuid, booking_id: Uuid) -> Result<Vec<CartBooking>, BookingError> {
        let path = format!(
            "{}?id=eq.{}&patient_id=eq.{}&status=eq.pending",
            CART_PATH, booking_id, patient_id
        );

        let removed = self
            .supabase
            .mutate(Method::DELETE, &path, None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        if removed.is_empty() {
            return Err(BookingError::BookingNotFound);
        }

        info!("Removed booking {} from cart of patient {}", booking_id, patient_id);
        self.revalidate_cart(patient_id).await
    }

    /// Attach a code to a cart booking. Unlike revalidation, a bad code here
    /// is reported to the caller.
    pub async fn apply_discount(
        &self,
        patient_id: Uuid,
        booking_id: Uuid,
        code: &str,
    ) -> Result<CartBooking, BookingError> {
        let mut booking = self
            .find_booking(patient_id, booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?;

        let applied = self.ledger.apply(booking.clinic_id, code, booking.price).await?;

        booking.discount = applied.into();
        self.persist_snapshot(&booking).await?;

        let cart = self.revalidate_cart(patient_id).await?;
        Ok(cart.into_iter().find(|b| b.id == booking_id).unwrap_or(booking))
    }

    pub async fn list_cart(&self, patient_id: Uuid) -> Result<Vec<CartBooking>, BookingError> {
        let path = format!(
            "{}?patient_id=eq.{}&status=eq.pending&order=created_at.asc",
            CART_PATH, patient_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        parse_all(rows)
    }

    pub async fn revalidate_cart(&self, patient_id: Uuid) -> Result<Vec<CartBooking>, BookingError> {
        let mut cart = self.list_cart(patient_id).await?;
        for booking in cart.iter_mut() {
            self.revalidate_booking(booking).await?;
        }
        Ok(cart)
    }

    /// Bring one booking's snapshot up to date; writes only when it changed.
    pub async fn revalidate_booking(&self, booking: &mut CartBooking) -> Result<bool, BookingError> {
        let refreshed = self
            .ledger
            .revalidate(booking.clinic_id, booking.price, &booking.discount)
            .await?;

        if refreshed == booking.discount {
            return Ok(false);
        }

        if booking.discount.has_discount() && !refreshed.has_discount() {
            warn!(
                "Discount {:?} on booking {} is no longer valid, reverting to full price",
                booking.discount.code, booking.id
            );
        }

        booking.discount = refreshed;
        self.persist_snapshot(booking).await?;
        Ok(true)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn insert_booking(
        &self,
        request: &AddToCartRequest,
        test_name: &str,
        price: f64,
        reservation: &SlotReservation,
        snapshot: &CartDiscountSnapshot,
    ) -> Result<CartBooking, BookingError> {
        let body = json!({
            "patient_id": request.patient_id,
            "clinic_id": request.clinic_id,
            "test_id": request.test_id,
            "test_name": test_name,
            "price": price,
            "scheduled_at": reservation.scheduled_at.to_rfc3339(),
            "ends_at": reservation.ends_at.to_rfc3339(),
            "slot_key": reservation.slot_key,
            "status": BookingStatus::Pending,
            "discount": snapshot,
        });

        // A concurrent booking of the same slot trips the unique slot_key index.
        let rows = self
            .supabase
            .mutate(Method::POST, CART_PATH, Some(body))
            .await
            .map_err(|e| {
                if SupabaseError::is_conflict(&e) {
                    BookingError::SlotTaken {
                        time: reservation.hour_marker.clone(),
                        date: reservation.local_date,
                    }
                } else {
                    BookingError::DatabaseError(e.to_string())
                }
            })?;

        let booking = parse_all(rows)?
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::DatabaseError("Failed to create booking".to_string()))?;

        info!("Booking {} created for {}", booking.id, reservation.scheduled_at);
        Ok(booking)
    }

    async fn find_booking(&self, patient_id: Uuid, booking_id: Uuid) -> Result<Option<CartBooking>, BookingError> {
        let path = format!(
            "{}?id=eq.{}&patient_id=eq.{}&limit=1",
            CART_PATH, booking_id, patient_id
        );
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(parse_all(rows)?.into_iter().next())
    }

    async fn persist_snapshot(&self, booking: &CartBooking) -> Result<(), BookingError> {
        debug!("Saving discount snapshot for booking {}", booking.id);

        let path = format!("{}?id=eq.{}", CART_PATH, booking.id);
        self.supabase
            .mutate(Method::PATCH, &path, Some(json!({ "discount": booking.discount })))
            .await
            .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}

fn parse_all(rows: Vec<Value>) -> Result<Vec<CartBooking>, BookingError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<CartBooking>, _>>()
        .map_err(|e| BookingError::DatabaseError(format!("Failed to parse cart bookings: {}", e)))
}
