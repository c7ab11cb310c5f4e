// libs/subscription-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// SUBSCRIPTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlanName {
    Standard,
    Premium,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Locked,
    Expired,
}

/// Claim spend for one calendar month, keyed `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySpending {
    pub month: String,
    pub total_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub plan_name: PlanName,
    /// Remaining spend allowance; only meaningful on premium plans.
    #[serde(default)]
    pub privilege: f64,
    #[serde(default)]
    pub monthly_spending: Vec<MonthlySpending>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub last_test_dates: Vec<DateTime<Utc>>,
    pub remaining_tests: i32,
    pub status: SubscriptionStatus,
    pub is_paid: bool,
    /// Bumped on every write; updates are conditional on the version read.
    #[serde(default)]
    pub version: i64,
}

impl Subscription {
    pub fn last_test_date(&self) -> Option<DateTime<Utc>> {
        self.last_test_dates.last().copied()
    }

    pub fn spent_in(&self, month: &str) -> f64 {
        self.monthly_spending
            .iter()
            .find(|entry| entry.month == month)
            .map(|entry| entry.total_spent)
            .unwrap_or(0.0)
    }
}

// ==============================================================================
// CLAIM MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: Uuid,
    /// Assigned by the store's sequence.
    pub claim_no: Option<i64>,
    pub patient_id: Uuid,
    pub clinic_id: Uuid,
    pub test_id: Uuid,
    pub test_name: String,
    pub cost: f64,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReceipt {
    pub claim_no: Option<i64>,
    pub remaining_balance: f64,
    pub total_spent_this_month: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRecordedEvent {
    pub claim: Claim,
    pub remaining_balance: f64,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordClaimRequest {
    pub patient_id: Uuid,
    pub test_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpendingQuery {
    pub month: Option<String>,
}
