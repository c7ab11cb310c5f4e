pub mod events;
pub mod ledger;

pub use events::{DiscountEventPublisher, TracingDiscountPublisher};
pub use ledger::DiscountLedger;
