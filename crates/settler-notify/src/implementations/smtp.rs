//! SMTP receipt notifier.
//!
//! Sends the buyer an HTML receipt for a settled order. An order created
//! without a buyer email is skipped: that is a data gap, not a dispatch
//! failure.

use crate::{NotifierFactory, NotifierInterface, NotifyError};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use settler_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Order, Schema, ValidationError,
};

/// Notifier that emails receipts over SMTP.
pub struct SmtpNotifier {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: String,
}

impl SmtpNotifier {
	/// Creates a notifier for the given relay and sender address.
	pub fn new(
		host: &str,
		port: u16,
		username: String,
		password: String,
		from: String,
	) -> Result<Self, NotifyError> {
		let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
			.map_err(|e| NotifyError::Configuration(format!("SMTP relay: {}", e)))?
			.port(port)
			.credentials(Credentials::new(username, password))
			.build();

		Ok(Self { transport, from })
	}
}

/// Renders the receipt body for a settled order.
pub fn render_receipt_html(order: &Order) -> String {
	let mut rows = String::new();
	for item in &order.line_items {
		rows.push_str(&format!(
			"<tr><td>{}</td><td>{}</td><td>{} {}</td><td>{} {}</td></tr>",
			item.product_id,
			item.quantity,
			order.currency,
			item.unit_price,
			order.currency,
			item.subtotal(),
		));
	}

	format!(
		"<html><body>\
		<h1>Payment Receipt</h1>\
		<p>Order <strong>{id}</strong> is confirmed.</p>\
		<p>Shipping to: {address}</p>\
		<table border=\"1\" cellpadding=\"6\">\
		<tr><th>Product</th><th>Qty</th><th>Unit price</th><th>Subtotal</th></tr>\
		{rows}\
		</table>\
		<p><strong>Total: {currency} {total}</strong></p>\
		<p>Payment reference: {reference}</p>\
		<p>Thank you for your order.</p>\
		</body></html>",
		id = order.id,
		address = order.shipping_address,
		rows = rows,
		currency = order.currency,
		total = order.total_amount,
		reference = order.payment_reference.as_deref().unwrap_or("-"),
	)
}

#[async_trait]
impl NotifierInterface for SmtpNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SmtpNotifierSchema)
	}

	async fn dispatch_receipt(&self, order: &Order) -> Result<(), NotifyError> {
		let Some(recipient) = order.buyer_email.as_deref() else {
			tracing::debug!(order_id = %order.id, "No buyer email on order, skipping receipt");
			return Ok(());
		};

		let message = Message::builder()
			.from(
				self.from
					.parse()
					.map_err(|e| NotifyError::Configuration(format!("sender address: {}", e)))?,
			)
			.to(recipient
				.parse()
				.map_err(|e| NotifyError::Dispatch(format!("recipient address: {}", e)))?)
			.subject("Your payment receipt")
			.header(ContentType::TEXT_HTML)
			.body(render_receipt_html(order))
			.map_err(|e| NotifyError::Dispatch(format!("message build: {}", e)))?;

		self.transport
			.send(message)
			.await
			.map_err(|e| NotifyError::Dispatch(format!("SMTP send: {}", e)))?;

		tracing::info!(order_id = %order.id, "Receipt emailed");
		Ok(())
	}
}

/// Configuration schema for SmtpNotifier.
pub struct SmtpNotifierSchema;

impl ConfigSchema for SmtpNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new("host", FieldType::String { non_empty: true }),
				Field::new("username", FieldType::String { non_empty: false }),
				Field::new("password", FieldType::String { non_empty: false }),
				Field::new("from", FieldType::String { non_empty: true }),
			],
			vec![Field::new(
				"port",
				FieldType::Integer {
					min: Some(1),
					max: Some(65535),
				},
			)],
		)
		.validate(config)
	}
}

/// Factory function to create an SMTP notifier from configuration.
///
/// Configuration parameters:
/// - `host`: SMTP relay host (required)
/// - `port`: relay port (default 587)
/// - `username` / `password`: relay credentials (required)
/// - `from`: sender address (required)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotifierInterface>, NotifyError> {
	SmtpNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let get_str = |key: &str| {
		config
			.get(key)
			.and_then(|v| v.as_str())
			.map(str::to_string)
			.ok_or_else(|| NotifyError::Configuration(format!("Missing '{}'", key)))
	};

	let port = config
		.get("port")
		.and_then(|v| v.as_integer())
		.unwrap_or(587) as u16;

	let notifier = SmtpNotifier::new(
		&get_str("host")?,
		port,
		get_str("username")?,
		get_str("password")?,
		get_str("from")?,
	)?;
	Ok(Box::new(notifier))
}

/// Registry entry for the SMTP notifier.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "smtp";
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
	use settler_types::{LineItem, OrderStatus};

	fn settled_order() -> Order {
		Order {
			id: "o1".to_string(),
			buyer_id: "b1".to_string(),
			buyer_email: Some("buyer@example.com".to_string()),
			line_items: vec![LineItem {
				product_id: "maize-seed".to_string(),
				quantity: 2,
				unit_price: Decimal::from(100),
			}],
			total_amount: Decimal::from(200),
			currency: "KES".to_string(),
			status: OrderStatus::Confirmed,
			payment_reference: Some("ws_CO_1".to_string()),
			shipping_address: "Nakuru".to_string(),
			created_at: 0,
			updated_at: 0,
		}
	}

	#[test]
	fn test_receipt_contains_items_total_and_reference() {
		let html = render_receipt_html(&settled_order());
		assert!(html.contains("maize-seed"));
		assert!(html.contains("KES 200"));
		assert!(html.contains("ws_CO_1"));
		assert!(html.contains("Nakuru"));
	}

	#[test]
	fn test_schema_requires_relay_settings() {
		let config: toml::Value = toml::from_str("host = \"smtp.example.com\"").unwrap();
		assert!(SmtpNotifierSchema.validate(&config).is_err());

		let config: toml::Value = toml::from_str(
			"host = \"smtp.example.com\"\nusername = \"u\"\npassword = \"p\"\nfrom = \"Shop <no-reply@example.com>\"",
		)
		.unwrap();
		assert!(SmtpNotifierSchema.validate(&config).is_ok());
	}
}
