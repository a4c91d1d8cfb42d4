//! Settlement handler: the callback leg of the payment protocol.
//!
//! Correlates an inbound notification back to its order and applies the
//! idempotent settlement transition. Every disposition except a storage
//! failure is acknowledged to the network: acknowledgment communicates
//! receipt, not business success, and a rejected delivery would only make
//! the network retry a payload that cannot self-correct. A storage failure
//! is the one case where a retry *can* help, so it is surfaced instead.

use crate::event_bus::EventBus;
use crate::state::{OrderStore, OrderStoreError};
use settler_settlement::{CorrelatorService, NoticeResult, SettlementError};
use settler_types::{SettlementEvent, SettlerEvent};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Errors that abort callback processing.
///
/// Only failures where an upstream redelivery can succeed later belong
/// here; everything else becomes a [`CallbackDisposition`].
#[derive(Debug, Error)]
pub enum SettlementHandlerError {
	/// The storage backend failed while resolving or transitioning.
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Outcome of processing one callback delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackDisposition {
	/// The order was settled by this delivery.
	Settled { order_id: String },
	/// The order was already settled; nothing changed, and the notifier
	/// is not re-fired.
	Duplicate { order_id: String },
	/// The network reported the payment attempt as failed; the order (if
	/// resolvable) stays pending for another attempt.
	PaymentFailed { tracking_id: String },
	/// The reference was absent or did not resolve to any order. Still
	/// acknowledged: the order will never appear, so a retry storm helps
	/// nobody.
	OrderNotFound { reference: String },
	/// The body did not have the expected envelope shape; answered with a
	/// client error and no further action.
	InvalidShape,
}

/// Handler for inbound payment-network callbacks.
pub struct SettlementHandler {
	orders: Arc<OrderStore>,
	correlator: Arc<CorrelatorService>,
	event_bus: EventBus,
}

impl SettlementHandler {
	/// Creates a new SettlementHandler.
	pub fn new(
		orders: Arc<OrderStore>,
		correlator: Arc<CorrelatorService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			orders,
			correlator,
			event_bus,
		}
	}

	/// Processes one callback delivery.
	#[instrument(skip_all)]
	pub async fn handle_callback(
		&self,
		body: &serde_json::Value,
	) -> Result<CallbackDisposition, SettlementHandlerError> {
		let notice = match self.correlator.parse(body) {
			Ok(notice) => notice,
			Err(SettlementError::InvalidShape(reason)) => {
				tracing::warn!(reason = %reason, "Callback with invalid shape");
				return Ok(CallbackDisposition::InvalidShape);
			},
		};

		if let NoticeResult::Failure { code, description } = &notice.result {
			tracing::warn!(
				tracking_id = %notice.transaction_id,
				code,
				description = %description,
				"Payment attempt failed"
			);
			self.event_bus
				.publish(SettlerEvent::Settlement(SettlementEvent::PaymentFailed {
					order_id: notice.order_id.clone(),
					tracking_id: notice.transaction_id.clone(),
					result_code: *code,
					result_desc: description.clone(),
				}))
				.ok();
			return Ok(CallbackDisposition::PaymentFailed {
				tracking_id: notice.transaction_id,
			});
		}

		let reference = notice.reference.clone().unwrap_or_default();
		let Some(order_id) = notice.order_id else {
			return Ok(self.unmatched(reference));
		};

		// Resolve before transitioning so a missing order stays an
		// acknowledged no-op rather than a storage error.
		match self.orders.get_order(&order_id).await {
			Ok(_) => {},
			Err(OrderStoreError::NotFound(_)) => {
				return Ok(self.unmatched(reference));
			},
			Err(e) => return Err(SettlementHandlerError::Storage(e.to_string())),
		}

		let outcome = self
			.orders
			.transition_to_confirmed(&order_id, &notice.transaction_id)
			.await
			.map_err(|e| SettlementHandlerError::Storage(e.to_string()))?;

		if outcome.applied {
			self.event_bus
				.publish(SettlerEvent::Settlement(SettlementEvent::Settled {
					order_id: order_id.clone(),
					payment_reference: notice.transaction_id,
				}))
				.ok();
			Ok(CallbackDisposition::Settled { order_id })
		} else {
			tracing::info!(order_id = %order_id, "Duplicate settlement callback ignored");
			self.event_bus
				.publish(SettlerEvent::Settlement(SettlementEvent::Duplicate {
					order_id: order_id.clone(),
				}))
				.ok();
			Ok(CallbackDisposition::Duplicate { order_id })
		}
	}

	fn unmatched(&self, reference: String) -> CallbackDisposition {
		tracing::warn!(reference = %reference, "Callback does not match any order");
		self.event_bus
			.publish(SettlerEvent::Settlement(SettlementEvent::Unmatched {
				reference: reference.clone(),
			}))
			.ok();
		CallbackDisposition::OrderNotFound { reference }
	}
}
