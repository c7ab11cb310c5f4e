use async_trait::async_trait;
use tracing::info;

use crate::models::ClaimRecordedEvent;

/// Side effect after a claim lands (patient email, clinic push). Failures are
/// logged by the caller and never undo the claim.
#[async_trait]
pub trait ClaimNotifier: Send + Sync {
    async fn claim_recorded(&self, event: &ClaimRecordedEvent) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct TracingClaimNotifier;

#[async_trait]
impl ClaimNotifier for TracingClaimNotifier {
    async fn claim_recorded(&self, event: &ClaimRecordedEvent) -> anyhow::Result<()> {
        info!(
            patient_id = %event.claim.patient_id,
            clinic_id = %event.claim.clinic_id,
            cost = event.claim.cost,
            remaining_balance = event.remaining_balance,
            "claim recorded"
        );
        Ok(())
    }
}
