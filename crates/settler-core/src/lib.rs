//! Core engine for the payment correlation and order settlement system.
//!
//! The engine composes the services around the two independent legs of the
//! payment protocol: initiation (order -> token -> payload -> network) and
//! correlation (callback -> reference -> order -> idempotent transition).
//! The legs share nothing but the persisted order record; the event loop
//! in [`SettlerEngine::run`] turns settlement events into receipt dispatch
//! without ever blocking the callback acknowledgment.

use rust_decimal::Decimal;
use settler_auth::AuthService;
use settler_config::Config;
use settler_gateway::{CardGatewayInterface, GatewayError, GatewayService, InitiationReceipt};
use settler_notify::NotifierService;
use settler_settlement::CorrelatorService;
use settler_types::{
	CreateOrderRequest, InitiatePaymentRequest, LineItem, Order, SettlementEvent, SettlerEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

pub mod builder;
pub mod event_bus;
pub mod handlers;
pub mod state;

pub use builder::{SettlerBuilder, SettlerFactories};
pub use event_bus::EventBus;
pub use handlers::{
	CallbackDisposition, PaymentError, PaymentHandler, SettlementHandler, SettlementHandlerError,
};
pub use state::{OrderStore, OrderStoreError, TransitionOutcome};

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration or wiring.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from one of the engine services.
	#[error("Service error: {0}")]
	Service(String),
	/// A request failed validation.
	#[error("Validation error: {0}")]
	Validation(String),
	/// A referenced entity does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The card payment path is not configured for this deployment.
	#[error("Card payments are not configured")]
	CardNotConfigured,
	/// Error from the card payment provider.
	#[error(transparent)]
	Gateway(#[from] GatewayError),
}

/// Main engine coordinating order settlement.
pub struct SettlerEngine {
	config: Config,
	orders: Arc<OrderStore>,
	notifier: Arc<NotifierService>,
	card: Option<Arc<dyn CardGatewayInterface>>,
	event_bus: EventBus,
	payment_handler: Arc<PaymentHandler>,
	settlement_handler: Arc<SettlementHandler>,
}

impl SettlerEngine {
	/// Creates a new engine from its composed services.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		config: Config,
		orders: Arc<OrderStore>,
		auth: Arc<AuthService>,
		gateway: Arc<GatewayService>,
		correlator: Arc<CorrelatorService>,
		card: Option<Arc<dyn CardGatewayInterface>>,
		notifier: Arc<NotifierService>,
		event_bus: EventBus,
		callback_url: String,
	) -> Self {
		let payment_handler = Arc::new(PaymentHandler::new(
			Arc::clone(&orders),
			auth,
			gateway,
			config.mpesa.shortcode.clone(),
			config.mpesa.passkey.clone(),
			callback_url,
			event_bus.clone(),
		));

		let settlement_handler = Arc::new(SettlementHandler::new(
			Arc::clone(&orders),
			correlator,
			event_bus.clone(),
		));

		Self {
			config,
			orders,
			notifier,
			card,
			event_bus,
			payment_handler,
			settlement_handler,
		}
	}

	/// The engine's configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The engine's event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Creates a new order in `pending` state.
	pub async fn create_order(&self, request: CreateOrderRequest) -> Result<Order, EngineError> {
		if request.buyer_id.trim().is_empty() {
			return Err(EngineError::Validation("buyerId must not be empty".to_string()));
		}
		if request.shipping_address.trim().is_empty() {
			return Err(EngineError::Validation(
				"shippingAddress must not be empty".to_string(),
			));
		}

		let line_items = request
			.line_items
			.into_iter()
			.map(|item| LineItem {
				product_id: item.product_id,
				quantity: item.quantity,
				unit_price: item.unit_price,
			})
			.collect();

		self.orders
			.create_order(
				request.buyer_id,
				request.buyer_email,
				line_items,
				request.shipping_address,
			)
			.await
			.map_err(|e| match e {
				OrderStoreError::InvalidOrder(msg) => EngineError::Validation(msg),
				OrderStoreError::NotFound(id) => EngineError::NotFound(id),
				OrderStoreError::Storage(msg) => EngineError::Service(msg),
			})
	}

	/// Retrieves an order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, EngineError> {
		self.orders.get_order(order_id).await.map_err(|e| match e {
			OrderStoreError::NotFound(id) => EngineError::NotFound(id),
			other => EngineError::Service(other.to_string()),
		})
	}

	/// Initiates a mobile payment for an order. Does not mutate the order.
	pub async fn initiate_payment(
		&self,
		request: &InitiatePaymentRequest,
	) -> Result<InitiationReceipt, PaymentError> {
		self.payment_handler.initiate(request).await
	}

	/// Processes an inbound payment-network callback.
	pub async fn handle_callback(
		&self,
		body: &serde_json::Value,
	) -> Result<CallbackDisposition, SettlementHandlerError> {
		self.settlement_handler.handle_callback(body).await
	}

	/// Creates a card payment intent through the synchronous path.
	pub async fn create_payment_intent(&self, amount: Decimal) -> Result<String, EngineError> {
		let card = self.card.as_ref().ok_or(EngineError::CardNotConfigured)?;
		Ok(card.create_payment_intent(amount).await?)
	}

	/// Runs the settlement event loop.
	///
	/// Consumes settlement events and dispatches the receipt notifier for
	/// each `Settled` event, which fires at most once per order, on the
	/// transition edge only. Must be running for receipts to go out.
	pub async fn run(&self) -> Result<(), EngineError> {
		let mut events = self.event_bus.subscribe();
		tracing::info!("Settlement event loop started");

		loop {
			match events.recv().await {
				Ok(SettlerEvent::Settlement(SettlementEvent::Settled { order_id, .. })) => {
					self.dispatch_receipt(order_id);
				},
				Ok(_) => {},
				Err(broadcast::error::RecvError::Lagged(missed)) => {
					tracing::warn!(missed, "Settlement event loop lagged behind publishers");
				},
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}

		tracing::info!("Settlement event loop stopped");
		Ok(())
	}

	/// Dispatches the receipt for a settled order on a separate task.
	///
	/// Failure is logged and swallowed: settlement truth lives in the
	/// order record, not in the notification's success.
	fn dispatch_receipt(&self, order_id: String) {
		let orders = Arc::clone(&self.orders);
		let notifier = Arc::clone(&self.notifier);
		let event_bus = self.event_bus.clone();

		tokio::spawn(async move {
			let order = match orders.get_order(&order_id).await {
				Ok(order) => order,
				Err(e) => {
					tracing::error!(
						order_id = %order_id,
						error = %e,
						"Receipt dispatch could not load order"
					);
					return;
				},
			};

			match notifier.dispatch_receipt(&order).await {
				Ok(()) => {
					event_bus
						.publish(SettlerEvent::Settlement(SettlementEvent::ReceiptDispatched {
							order_id,
						}))
						.ok();
				},
				Err(e) => {
					tracing::error!(
						order_id = %order_id,
						error = %e,
						"Receipt dispatch failed; order remains confirmed"
					);
				},
			}
		});
	}
}
