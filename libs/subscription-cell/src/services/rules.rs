// libs/subscription-cell/src/services/rules.rs
use chrono::{DateTime, Duration, Utc};

use shared_config::AppConfig;

use crate::error::SubscriptionError;
use crate::models::{MonthlySpending, Subscription};

pub const ACTIVATION_DELAY_HOURS: i64 = 72;
pub const MIN_DAYS_BETWEEN_TESTS: i64 = 14;
pub const MONTHLY_TEST_QUOTA: i32 = 2;

/// Time-based privilege rules. Everything takes `now` explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivilegeRules {
    pub activation_delay: Duration,
    pub test_interval: Duration,
    pub claim_cooldown: Duration,
}

impl Default for PrivilegeRules {
    fn default() -> Self {
        Self::with_claim_cooldown_days(shared_config::DEFAULT_ORDER_COOLDOWN_DAYS)
    }
}

impl PrivilegeRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::with_claim_cooldown_days(config.order_cooldown_days)
    }

    pub fn with_claim_cooldown_days(days: i64) -> Self {
        Self {
            activation_delay: Duration::hours(ACTIVATION_DELAY_HOURS),
            test_interval: Duration::days(MIN_DAYS_BETWEEN_TESTS),
            claim_cooldown: Duration::days(days),
        }
    }

    /// Activation delay, then the gap since the last test, then the quota.
    /// The first failing rule is reported.
    pub fn check_usage(&self, subscription: &Subscription, now: DateTime<Utc>) -> Result<(), SubscriptionError> {
        let usable_from = subscription.start_date + self.activation_delay;
        if now < usable_from {
            return Err(SubscriptionError::ActivationPending(hours_until(now, usable_from)));
        }

        if let Some(last) = subscription.last_test_date() {
            let next_eligible = last + self.test_interval;
            if now < next_eligible {
                return Err(SubscriptionError::TestIntervalNotElapsed(next_eligible));
            }
        }

        if subscription.remaining_tests <= 0 {
            return Err(SubscriptionError::QuotaExhausted);
        }

        Ok(())
    }

    pub fn check_claim_cooldown(
        &self,
        last_claim_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), SubscriptionError> {
        match last_claim_at {
            Some(last) if now < last + self.claim_cooldown => {
                Err(SubscriptionError::ClaimCooldown(last + self.claim_cooldown))
            }
            _ => Ok(()),
        }
    }
}

/// Whole hours from `now` until `then`, rounded up.
fn hours_until(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    let seconds = (then - now).num_seconds().max(0);
    (seconds + 3599) / 3600
}

pub fn month_key(at: DateTime<Utc>) -> String {
    at.format("%Y-%m").to_string()
}

/// Add `amount` to the entry for `month`, creating it when absent.
/// Returns the month's new total.
pub fn add_monthly_spend(entries: &mut Vec<MonthlySpending>, month: &str, amount: f64) -> f64 {
    match entries.iter_mut().find(|entry| entry.month == month) {
        Some(entry) => {
            entry.total_spent += amount;
            entry.total_spent
        }
        None => {
            entries.push(MonthlySpending {
                month: month.to_string(),
                total_spent: amount,
            });
            amount
        }
    }
}

/// The state a successful claim leaves behind, computed before any write.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimPlan {
    pub privilege: f64,
    pub monthly_spending: Vec<MonthlySpending>,
    pub total_spent_this_month: f64,
}

/// Cooldown first, then balance. A failed plan leaves the subscription untouched.
pub fn plan_claim(
    rules: &PrivilegeRules,
    subscription: &Subscription,
    price: f64,
    last_claim_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<ClaimPlan, SubscriptionError> {
    rules.check_claim_cooldown(last_claim_at, now)?;

    if subscription.privilege < price {
        return Err(SubscriptionError::InsufficientPrivilege {
            balance: subscription.privilege,
            required: price,
        });
    }

    let mut monthly_spending = subscription.monthly_spending.clone();
    let total_spent_this_month = add_monthly_spend(&mut monthly_spending, &month_key(now), price);

    Ok(ClaimPlan {
        privilege: subscription.privilege - price,
        monthly_spending,
        total_spent_this_month,
    })
}
