pub mod activation_scheduler;
pub mod membership;
pub mod membership_expiry;
pub mod notifier;
