pub mod notifier;
pub mod privilege;
pub mod rules;

pub use notifier::{ClaimNotifier, TracingClaimNotifier};
pub use privilege::PrivilegeService;
pub use rules::{month_key, PrivilegeRules};
