//! Engine events carried on the event bus.
//!
//! Events decouple the callback acknowledgment path from side effects: the
//! settlement handler publishes and returns, and the engine's event loop
//! reacts (receipt dispatch, logging) without delaying the acknowledgment.

use serde::{Deserialize, Serialize};

/// Top-level event type encompassing all engine events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettlerEvent {
	/// Events from the payment initiation path.
	Payment(PaymentEvent),
	/// Events from the callback correlation path.
	Settlement(SettlementEvent),
}

/// Events related to payment initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentEvent {
	/// The network accepted an initiation request for processing.
	/// Acceptance does not change order state.
	InitiationAccepted {
		order_id: String,
		tracking_id: String,
	},
	/// An initiation attempt failed after classification and retries.
	InitiationFailed { order_id: String, reason: String },
}

/// Events related to callback correlation and settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SettlementEvent {
	/// The order transitioned to confirmed. Fired at most once per order;
	/// the receipt notifier keys off this event.
	Settled {
		order_id: String,
		payment_reference: String,
	},
	/// A duplicate success callback arrived for an already settled order.
	Duplicate { order_id: String },
	/// The network reported the payment attempt as failed; the order
	/// remains pending and eligible for another attempt. Failure
	/// callbacks carry no metadata, so the order is not always
	/// resolvable.
	PaymentFailed {
		order_id: Option<String>,
		tracking_id: String,
		result_code: i64,
		result_desc: String,
	},
	/// A callback reference did not resolve to any known order.
	Unmatched { reference: String },
	/// A receipt was dispatched for a settled order.
	ReceiptDispatched { order_id: String },
}
