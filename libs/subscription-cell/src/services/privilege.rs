// libs/subscription-cell/src/services/privilege.rs
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{CatalogRepository, SupabaseClient};

use crate::error::SubscriptionError;
use crate::models::{
    Claim, ClaimReceipt, ClaimRecordedEvent, MonthlySpending, PlanName, Subscription,
};
use crate::services::notifier::{ClaimNotifier, TracingClaimNotifier};
use crate::services::rules::{month_key, plan_claim, PrivilegeRules};

const SUBSCRIPTIONS_PATH: &str = "/rest/v1/subscriptions";
const CLAIMS_PATH: &str = "/rest/v1/claims";

/// Privilege accounting over a patient's active subscription: the test usage
/// path (activation delay, test interval, quota) and the premium claim path
/// (claim cooldown, balance, monthly rollup, clinic ledger).
pub struct PrivilegeService {
    supabase: Arc<SupabaseClient>,
    catalog: CatalogRepository,
    rules: PrivilegeRules,
    notifier: Arc<dyn ClaimNotifier>,
}

impl PrivilegeService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(
            Arc::new(SupabaseClient::new(config)),
            PrivilegeRules::from_config(config),
        )
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, rules: PrivilegeRules) -> Self {
        Self::with_notifier(supabase, rules, Arc::new(TracingClaimNotifier))
    }

    pub fn with_notifier(
        supabase: Arc<SupabaseClient>,
        rules: PrivilegeRules,
        notifier: Arc<dyn ClaimNotifier>,
    ) -> Self {
        Self {
            catalog: CatalogRepository::new(Arc::clone(&supabase)),
            supabase,
            rules,
            notifier,
        }
    }

    pub async fn can_use(&self, patient_id: Uuid) -> Result<Subscription, SubscriptionError> {
        self.can_use_at(patient_id, Utc::now()).await
    }

    pub async fn can_use_at(&self, patient_id: Uuid, now: DateTime<Utc>) -> Result<Subscription, SubscriptionError> {
        let path = format!(
            "{}?patient_id=eq.{}&status=eq.active&is_paid=eq.true&limit=1",
            SUBSCRIPTIONS_PATH, patient_id
        );
        let subscription = self
            .fetch_first::<Subscription>(&path)
            .await?
            .ok_or(SubscriptionError::SubscriptionNotFound)?;

        if let Err(e) = self.rules.check_usage(&subscription, now) {
            warn!("Subscription {} not usable for patient {}: {}", subscription.id, patient_id, e);
            return Err(e);
        }

        Ok(subscription)
    }

    /// Consume one test from the plan: append the usage date and spend quota.
    pub async fn record_test_usage(&self, patient_id: Uuid) -> Result<Subscription, SubscriptionError> {
        self.record_test_usage_at(patient_id, Utc::now()).await
    }

    pub async fn record_test_usage_at(
        &self,
        patient_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Subscription, SubscriptionError> {
        let subscription = self.can_use_at(patient_id, now).await?;

        let mut last_test_dates = subscription.last_test_dates.clone();
        last_test_dates.push(now);

        let updated = self
            .update_versioned(
                &subscription,
                json!({
                    "last_test_dates": last_test_dates,
                    "remaining_tests": subscription.remaining_tests - 1,
                }),
            )
            .await?;

        info!(
            "Recorded test usage for patient {}, {} test(s) left",
            patient_id, updated.remaining_tests
        );
        Ok(updated)
    }

    pub async fn record_claim(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        test_id: Uuid,
    ) -> Result<ClaimReceipt, SubscriptionError> {
        self.record_claim_at(clinic_id, patient_id, test_id, Utc::now()).await
    }

    /// Spend premium privilege on a clinic test.
    ///
    /// Three separate writes follow a successful check: the subscription
    /// (conditional on its version), the claim row, and the clinic's owed
    /// balance. They share no transaction. A failure after the first write is
    /// logged with both amounts and reported as a partial claim.
    pub async fn record_claim_at(
        &self,
        clinic_id: Uuid,
        patient_id: Uuid,
        test_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt, SubscriptionError> {
        let path = format!(
            "{}?patient_id=eq.{}&status=eq.active&plan_name=eq.premium&limit=1",
            SUBSCRIPTIONS_PATH, patient_id
        );
        let subscription = self
            .fetch_first::<Subscription>(&path)
            .await?
            .filter(|sub| sub.plan_name == PlanName::Premium)
            .ok_or(SubscriptionError::PremiumNotFound)?;

        let test = self
            .catalog
            .get_lab_test(test_id)
            .await
            .map_err(|e| SubscriptionError::DatabaseError(e.to_string()))?
            .filter(|test| test.clinic_id == clinic_id)
            .ok_or(SubscriptionError::TestNotFound)?;

        let last_claim_at = self.last_claim(patient_id).await?.map(|claim| claim.claimed_at);

        let plan = match plan_claim(&self.rules, &subscription, test.price, last_claim_at, now) {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Claim rejected for patient {} at clinic {}: {}", patient_id, clinic_id, e);
                return Err(e);
            }
        };

        self.update_versioned(
            &subscription,
            json!({
                "privilege": plan.privilege,
                "monthly_spending": plan.monthly_spending,
            }),
        )
        .await?;

        let claim = self
            .insert_claim(patient_id, clinic_id, test_id, &test.name, test.price, now)
            .await
            .map_err(|e| {
                error!(
                    "Privilege of patient {} reduced by {} but claim insert failed: {}",
                    patient_id, test.price, e
                );
                SubscriptionError::PartialClaim(format!("claim not saved: {}", e))
            })?;

        // TODO: compensate by restoring the privilege when the ledger increment fails.
        if let Err(e) = self.catalog.increment_money_owed(clinic_id, test.price).await {
            error!(
                "Claim {:?} saved but clinic {} owed balance not increased by {}: {}",
                claim.claim_no, clinic_id, test.price, e
            );
            return Err(SubscriptionError::PartialClaim(format!(
                "clinic ledger not updated: {}",
                e
            )));
        }

        info!(
            "Claim {:?} recorded: patient {} spent {} at clinic {}, {} left",
            claim.claim_no, patient_id, test.price, clinic_id, plan.privilege
        );

        let receipt = ClaimReceipt {
            claim_no: claim.claim_no,
            remaining_balance: plan.privilege,
            total_spent_this_month: plan.total_spent_this_month,
        };

        self.notify(ClaimRecordedEvent {
            claim,
            remaining_balance: plan.privilege,
        });

        Ok(receipt)
    }

    /// The spend entry for `month` (`YYYY-MM`, default current UTC month).
    pub async fn monthly_spend(
        &self,
        patient_id: Uuid,
        month: Option<&str>,
    ) -> Result<MonthlySpending, SubscriptionError> {
        let month = match month {
            Some(raw) => parse_month(raw)?,
            None => month_key(Utc::now()),
        };

        let path = format!(
            "{}?patient_id=eq.{}&status=eq.active&limit=1",
            SUBSCRIPTIONS_PATH, patient_id
        );
        let subscription = self
            .fetch_first::<Subscription>(&path)
            .await?
            .ok_or(SubscriptionError::SubscriptionNotFound)?;

        Ok(MonthlySpending {
            total_spent: subscription.spent_in(&month),
            month,
        })
    }

    pub async fn list_claims(&self, patient_id: Uuid) -> Result<Vec<Claim>, SubscriptionError> {
        let path = format!("{}?patient_id=eq.{}&order=claimed_at.desc", CLAIMS_PATH, patient_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| SubscriptionError::DatabaseError(e.to_string()))?;

        parse_rows(rows)
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn fetch_first<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SubscriptionError> {
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None)
            .await
            .map_err(|e| SubscriptionError::DatabaseError(e.to_string()))?;

        Ok(parse_rows(rows)?.into_iter().next())
    }

    async fn last_claim(&self, patient_id: Uuid) -> Result<Option<Claim>, SubscriptionError> {
        let path = format!(
            "{}?patient_id=eq.{}&order=claimed_at.desc&limit=1",
            CLAIMS_PATH, patient_id
        );
        self.fetch_first(&path).await
    }

    /// Write `changes` only if nobody else has written since `current` was read.
    async fn update_versioned(
        &self,
        current: &Subscription,
        mut changes: Value,
    ) -> Result<Subscription, SubscriptionError> {
        if let Some(fields) = changes.as_object_mut() {
            fields.insert("version".to_string(), json!(current.version + 1));
        }

        let path = format!(
            "{}?id=eq.{}&version=eq.{}",
            SUBSCRIPTIONS_PATH, current.id, current.version
        );
        debug!("Updating subscription {} at version {}", current.id, current.version);

        let rows = self
            .supabase
            .mutate(Method::PATCH, &path, Some(changes))
            .await
            .map_err(|e| SubscriptionError::DatabaseError(e.to_string()))?;

        match parse_rows::<Subscription>(rows)?.into_iter().next() {
            Some(updated) => Ok(updated),
            None => {
                warn!("Subscription {} changed since version {}", current.id, current.version);
                Err(SubscriptionError::ConcurrentUpdate)
            }
        }
    }

    async fn insert_claim(
        &self,
        patient_id: Uuid,
        clinic_id: Uuid,
        test_id: Uuid,
        test_name: &str,
        cost: f64,
        claimed_at: DateTime<Utc>,
    ) -> anyhow::Result<Claim> {
        let body = json!({
            "patient_id": patient_id,
            "clinic_id": clinic_id,
            "test_id": test_id,
            "test_name": test_name,
            "cost": cost,
            "claimed_at": claimed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });

        let rows = self.supabase.mutate(Method::POST, CLAIMS_PATH, Some(body)).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("store returned no claim row"))?;

        Ok(serde_json::from_value(row)?)
    }

    fn notify(&self, event: ClaimRecordedEvent) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.claim_recorded(&event).await {
                error!("Failed to send claim notification for patient {}: {}", event.claim.patient_id, e);
            }
        });
    }
}

fn parse_month(raw: &str) -> Result<String, SubscriptionError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(&format!("{}-01", trimmed), "%Y-%m-%d")
        .map(|date| date.format("%Y-%m").to_string())
        .map_err(|_| SubscriptionError::InvalidMonth(raw.to_string()))
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, SubscriptionError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| SubscriptionError::DatabaseError(format!("Failed to parse response: {}", e)))
}
