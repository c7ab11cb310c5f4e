use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub order_cooldown_days: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            order_cooldown_days: shared_config::DEFAULT_ORDER_COOLDOWN_DAYS,
        }
    }
}

impl TestConfig {
    /// Config pointed at a mock server, e.g. `wiremock::MockServer::uri()`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            supabase_url: url.into(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            order_cooldown_days: self.order_cooldown_days,
            api_port: shared_config::DEFAULT_API_PORT,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// PostgREST rows shaped like the marketplace tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn clinic(clinic_id: Uuid, country: &str) -> Value {
        json!({
            "id": clinic_id,
            "name": "Test Clinic",
            "country": country,
            "currency": "NGN",
            "total_money_owed": 0.0,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn lab_test(test_id: Uuid, clinic_id: Uuid, price: f64) -> Value {
        json!({
            "id": test_id,
            "clinic_id": clinic_id,
            "name": "Full Blood Count",
            "price": price,
            "is_deleted": false
        })
    }

    pub fn availability(clinic_id: Uuid, day: &str, open_hour: u32, close_hour: u32) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "day": day,
            "time_ranges": [{ "open_hour": open_hour, "close_hour": close_hour }],
            "is_closed": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    /// `status` is the stored integer: 0 active, 1 expired.
    pub fn discount(clinic_id: Uuid, code: &str, percentage: u8, valid_until: &str, status: u8) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "code": code,
            "percentage": percentage,
            "valid_until": valid_until,
            "status": status,
            "is_deleted": false,
            "is_hidden": false,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn cart_booking(patient_id: Uuid, clinic_id: Uuid, price: f64, scheduled_at: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "test_id": Uuid::new_v4(),
            "test_name": "Full Blood Count",
            "price": price,
            "scheduled_at": scheduled_at,
            "slot_key": format!("{}|test", clinic_id),
            "status": "pending",
            "discount": {
                "code": null,
                "percentage": null,
                "discount_amount": 0.0,
                "final_price": price,
                "expires_at": null
            },
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn subscription(patient_id: Uuid, plan_name: &str, privilege: f64, start_date: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "plan_name": plan_name,
            "privilege": privilege,
            "monthly_spending": [],
            "start_date": start_date,
            "last_test_dates": [],
            "remaining_tests": 2,
            "status": "active",
            "is_paid": true,
            "version": 1
        })
    }

    pub fn claim(patient_id: Uuid, clinic_id: Uuid, cost: f64, claimed_at: &str) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "claim_no": 1,
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "test_id": Uuid::new_v4(),
            "test_name": "Full Blood Count",
            "cost": cost,
            "claimed_at": claimed_at
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
