use async_trait::async_trait;
use tracing::info;

use crate::models::DiscountCreatedEvent;

/// Fan-out hook fired after a visible discount is created. Delivery is
/// best-effort: the ledger logs failures and never rolls back.
#[async_trait]
pub trait DiscountEventPublisher: Send + Sync {
    async fn discount_created(&self, event: &DiscountCreatedEvent) -> anyhow::Result<()>;
}

/// Default publisher: records the event in the service log.
#[derive(Debug, Default)]
pub struct TracingDiscountPublisher;

#[async_trait]
impl DiscountEventPublisher for TracingDiscountPublisher {
    async fn discount_created(&self, event: &DiscountCreatedEvent) -> anyhow::Result<()> {
        info!(
            clinic_id = %event.clinic_id,
            code = %event.discount.code,
            percentage = event.discount.percentage,
            "discount created"
        );
        Ok(())
    }
}
