pub mod batch_notifier;
pub mod configuration;
