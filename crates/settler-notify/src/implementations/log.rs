//! Log-only notifier.
//!
//! Records the receipt in the service log instead of delivering it
//! anywhere. The default for development and tests.

use crate::{NotifierFactory, NotifierInterface, NotifyError};
use async_trait::async_trait;
use settler_types::{ConfigSchema, ImplementationRegistry, Order, Schema, ValidationError};

/// Notifier that only logs.
pub struct LogNotifier;

#[async_trait]
impl NotifierInterface for LogNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}

	async fn dispatch_receipt(&self, order: &Order) -> Result<(), NotifyError> {
		tracing::info!(
			order_id = %order.id,
			total = %order.total_amount,
			currency = %order.currency,
			"Receipt (log notifier)"
		);
		Ok(())
	}
}

/// Configuration schema for LogNotifier; no fields required.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a log notifier from configuration.
pub fn create_notifier(_config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	Ok(Box::new(LogNotifier))
}

/// Registry entry for the log notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl crate::NotifierRegistry for Registry {}
