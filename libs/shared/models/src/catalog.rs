use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clinic record as owned by the clinic-management side. Only the identity,
/// country and ledger fields are read here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    #[serde(default)]
    pub total_money_owed: f64,
    pub created_at: Option<DateTime<Utc>>,
}

/// A diagnostic test from a clinic's catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub is_deleted: bool,
}
