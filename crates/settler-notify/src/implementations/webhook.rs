//! Webhook receipt notifier.
//!
//! POSTs a JSON receipt to a configured URL, for deployments that feed
//! receipts into a downstream system instead of mailing the buyer.

use crate::{NotifierFactory, NotifierInterface, NotifyError};
use async_trait::async_trait;
use serde::Serialize;
use settler_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, LineItem, Order, Schema,
	ValidationError,
};
use std::time::Duration;

/// Notifier that delivers receipts to an HTTP endpoint.
pub struct WebhookNotifier {
	http: reqwest::Client,
	url: String,
}

impl WebhookNotifier {
	/// Creates a notifier posting to the given URL.
	pub fn new(url: String, timeout: Duration) -> Result<Self, NotifyError> {
		let http = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| NotifyError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self { http, url })
	}
}

/// Receipt body posted to the webhook.
#[derive(Debug, Serialize)]
struct ReceiptPayload<'a> {
	#[serde(rename = "orderId")]
	order_id: &'a str,
	status: String,
	#[serde(rename = "totalAmount")]
	total_amount: String,
	currency: &'a str,
	#[serde(rename = "paymentReference")]
	payment_reference: Option<&'a str>,
	#[serde(rename = "lineItems")]
	line_items: &'a [LineItem],
}

impl<'a> ReceiptPayload<'a> {
	fn from_order(order: &'a Order) -> Self {
		Self {
			order_id: &order.id,
			status: order.status.to_string(),
			total_amount: order.total_amount.to_string(),
			currency: &order.currency,
			payment_reference: order.payment_reference.as_deref(),
			line_items: &order.line_items,
		}
	}
}

#[async_trait]
impl NotifierInterface for WebhookNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebhookNotifierSchema)
	}

	async fn dispatch_receipt(&self, order: &Order) -> Result<(), NotifyError> {
		let response = self
			.http
			.post(&self.url)
			.json(&ReceiptPayload::from_order(order))
			.send()
			.await
			.map_err(|e| NotifyError::Dispatch(e.to_string()))?;

		if !response.status().is_success() {
			return Err(NotifyError::Dispatch(format!(
				"webhook returned {}",
				response.status()
			)));
		}

		tracing::info!(order_id = %order.id, url = %self.url, "Receipt posted");
		Ok(())
	}
}

/// Configuration schema for WebhookNotifier.
pub struct WebhookNotifierSchema;

impl ConfigSchema for WebhookNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("url", FieldType::String { non_empty: true })],
			vec![Field::new(
				"timeout_secs",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		)
		.validate(config)
	}
}

/// Factory function to create a webhook notifier from configuration.
///
/// Configuration parameters:
/// - `url`: endpoint receiving receipt payloads (required)
/// - `timeout_secs`: request timeout (default 10)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	WebhookNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("Missing 'url'".to_string()))?;
	let timeout = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	let notifier = WebhookNotifier::new(url.to_string(), Duration::from_secs(timeout))?;
	Ok(Box::new(notifier))
}

/// Registry entry for the webhook notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "webhook";
	type Factory = NotifierFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl crate::NotifierRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;
	use settler_types::OrderStatus;

	#[test]
	fn test_receipt_payload_shape() {
		let order = Order {
			id: "o1".to_string(),
			buyer_id: "b1".to_string(),
			buyer_email: None,
			line_items: vec![LineItem {
				product_id: "sku-1".to_string(),
				quantity: 2,
				unit_price: Decimal::from(100),
			}],
			total_amount: Decimal::from(200),
			currency: "KES".to_string(),
			status: OrderStatus::Confirmed,
			payment_reference: Some("ws_CO_1".to_string()),
			shipping_address: "Eldoret".to_string(),
			created_at: 0,
			updated_at: 0,
		};

		let value = serde_json::to_value(ReceiptPayload::from_order(&order)).unwrap();
		assert_eq!(value["orderId"], "o1");
		assert_eq!(value["status"], "confirmed");
		assert_eq!(value["paymentReference"], "ws_CO_1");
		assert_eq!(value["lineItems"][0]["product_id"], "sku-1");
	}

	#[test]
	fn test_factory_requires_url() {
		let config: toml::Value = toml::from_str("timeout_secs = 5").unwrap();
		assert!(matches!(
			create_notifier(&config),
			Err(NotifyError::Configuration(_))
		));
	}
}
