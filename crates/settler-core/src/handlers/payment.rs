//! Payment initiation handler.
//!
//! Drives the outbound leg: validate the order, obtain an access token,
//! build the initiation payload, and deliver it with bounded retry. A
//! successful initiation changes no order state; only a subsequent
//! successful callback settles the order.

use crate::event_bus::EventBus;
use crate::state::{OrderStore, OrderStoreError};
use chrono::Utc;
use rust_decimal::Decimal;
use settler_auth::{AuthError, AuthService};
use settler_gateway::{build_stk_push, GatewayError, GatewayService, InitiationReceipt};
use settler_types::{
	InitiatePaymentRequest, PaymentEvent, SecretString, SettlerEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors that can occur during payment initiation.
#[derive(Debug, Error)]
pub enum PaymentError {
	/// The referenced order does not exist.
	#[error("Order not found: {0}")]
	OrderNotFound(String),
	/// The order is not awaiting payment.
	#[error("Order {0} is not awaiting payment")]
	NotPayable(String),
	/// The order record violates an initiation precondition.
	#[error("Validation error: {0}")]
	Validation(String),
	/// Token acquisition failed.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Payload construction or delivery failed.
	#[error(transparent)]
	Gateway(#[from] GatewayError),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Handler for the payment initiation flow.
pub struct PaymentHandler {
	orders: Arc<OrderStore>,
	auth: Arc<AuthService>,
	gateway: Arc<GatewayService>,
	shortcode: String,
	passkey: SecretString,
	callback_url: String,
	event_bus: EventBus,
}

impl PaymentHandler {
	/// Creates a new PaymentHandler.
	pub fn new(
		orders: Arc<OrderStore>,
		auth: Arc<AuthService>,
		gateway: Arc<GatewayService>,
		shortcode: String,
		passkey: SecretString,
		callback_url: String,
		event_bus: EventBus,
	) -> Self {
		Self {
			orders,
			auth,
			gateway,
			shortcode,
			passkey,
			callback_url,
			event_bus,
		}
	}

	/// Initiates a mobile payment for an order.
	#[instrument(skip_all, fields(order_id = %request.order_id))]
	pub async fn initiate(
		&self,
		request: &InitiatePaymentRequest,
	) -> Result<InitiationReceipt, PaymentError> {
		let order = match self.orders.get_order(&request.order_id).await {
			Ok(order) => order,
			Err(OrderStoreError::NotFound(id)) => return Err(PaymentError::OrderNotFound(id)),
			Err(e) => return Err(PaymentError::Storage(e.to_string())),
		};

		if !order.awaiting_payment() {
			return Err(PaymentError::NotPayable(order.id));
		}
		if order.total_amount <= Decimal::ZERO {
			return Err(PaymentError::Validation(format!(
				"order {} has a non-positive total",
				order.id
			)));
		}
		if request.amount != order.total_amount {
			// Accepted, but worth a trace: the client asked to collect a
			// different figure than the order total.
			tracing::warn!(
				requested = %request.amount,
				order_total = %order.total_amount,
				"Initiation amount differs from order total"
			);
		}

		let token = self.auth.access_token().await?;

		let payload = build_stk_push(
			&self.shortcode,
			self.passkey.expose(),
			request.amount,
			&request.phone_number,
			&order.id,
			&self.callback_url,
			Utc::now(),
		)?;

		let receipt = match self.gateway.initiate(&token, &payload).await {
			Ok(receipt) => receipt,
			Err(e) => {
				self.event_bus
					.publish(SettlerEvent::Payment(PaymentEvent::InitiationFailed {
						order_id: order.id.clone(),
						reason: e.to_string(),
					}))
					.ok();
				return Err(e.into());
			},
		};

		self.event_bus
			.publish(SettlerEvent::Payment(PaymentEvent::InitiationAccepted {
				order_id: order.id.clone(),
				tracking_id: receipt.tracking_id.clone(),
			}))
			.ok();

		Ok(receipt)
	}
}
