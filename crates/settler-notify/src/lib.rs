//! Receipt notification for the settlement engine.
//!
//! After an order settles, a receipt is dispatched exactly once as a side
//! effect of the `pending -> confirmed` transition. Settlement truth lives
//! in the order record: a failed dispatch is logged by the caller and never
//! rolls the transition back. Implementations are selected from
//! configuration through the factory registry.

use async_trait::async_trait;
use settler_types::{ConfigSchema, ImplementationRegistry, Order};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod smtp;
	pub mod webhook;
}

/// Errors that can occur during receipt dispatch.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The receipt could not be delivered.
	#[error("Dispatch failed: {0}")]
	Dispatch(String),
	/// The notifier could not be constructed.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for receipt notifiers.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	/// Returns the configuration schema for this notifier implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Dispatches a receipt for a settled order.
	async fn dispatch_receipt(&self, order: &Order) -> Result<(), NotifyError>;
}

/// Type alias for notifier factory functions.
pub type NotifierFactory = fn(&toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError>;

/// Registry trait for notifier implementations.
pub trait NotifierRegistry: ImplementationRegistry<Factory = NotifierFactory> {}

/// Returns all registered notifier implementations as (name, factory) pairs.
pub fn get_all_implementations() -> Vec<(&'static str, NotifierFactory)> {
	use implementations::{log, smtp, webhook};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(smtp::Registry::NAME, smtp::Registry::factory()),
		(webhook::Registry::NAME, webhook::Registry::factory()),
	]
}

/// Service wrapping the configured notifier implementation.
pub struct NotifierService {
	implementation: Box<dyn NotifierInterface>,
}

impl NotifierService {
	/// Creates a new NotifierService with the specified implementation.
	pub fn new(implementation: Box<dyn NotifierInterface>) -> Self {
		Self { implementation }
	}

	/// Dispatches a receipt for a settled order.
	pub async fn dispatch_receipt(&self, order: &Order) -> Result<(), NotifyError> {
		self.implementation.dispatch_receipt(order).await
	}
}
