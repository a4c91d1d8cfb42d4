//! Callback correlation for the settlement engine.
//!
//! The payment network delivers the true payment outcome asynchronously,
//! joined to the originating order only by the correlation reference echoed
//! in the callback metadata. This crate parses an inbound notification body
//! into a `PaymentNotice`: shape validation, reference extraction, and
//! result interpretation. Applying the notice to an order (the idempotent
//! transition) belongs to the engine's settlement handler, so the parse
//! leg stays pure and independently testable.

use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod daraja;
}

/// Errors that can occur during callback correlation.
#[derive(Debug, Error)]
pub enum SettlementError {
	/// The notification body does not have the expected envelope shape.
	/// The receiving endpoint answers with a client error and takes no
	/// further action; it must never crash on a malformed body.
	#[error("Invalid callback shape: {0}")]
	InvalidShape(String),
}

/// Interpreted result of a payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NoticeResult {
	/// The network reports the payment as completed.
	Success,
	/// The network reports the attempt as failed or abandoned.
	Failure { code: i64, description: String },
}

/// A parsed notification from the payment network.
///
/// `order_id` is the candidate extracted from the correlation reference;
/// it has not yet been resolved against the order store. Failure notices
/// carry no metadata, so `reference` and `order_id` are absent for them.
#[derive(Debug, Clone)]
pub struct PaymentNotice {
	/// The network's transaction identifier for this payment attempt.
	pub transaction_id: String,
	/// The echoed correlation reference, when present.
	pub reference: Option<String>,
	/// Candidate order id recovered from the reference, when well-formed.
	pub order_id: Option<String>,
	/// The network's receipt number, when present.
	pub receipt_number: Option<String>,
	/// Interpreted payment result.
	pub result: NoticeResult,
}

impl PaymentNotice {
	/// True when the notice reports a completed payment.
	pub fn is_success(&self) -> bool {
		self.result == NoticeResult::Success
	}
}

/// Trait defining the interface for callback correlators.
///
/// One implementation per payment network envelope format.
pub trait CorrelatorInterface: Send + Sync {
	/// Parses a notification body into a `PaymentNotice`.
	///
	/// Fails only on shape violations; a notice for an unknown order or a
	/// failed payment parses successfully and is interpreted downstream.
	fn parse(&self, body: &serde_json::Value) -> Result<PaymentNotice, SettlementError>;
}

/// Service wrapping the configured correlator implementation.
pub struct CorrelatorService {
	implementation: Box<dyn CorrelatorInterface>,
}

impl CorrelatorService {
	/// Creates a new CorrelatorService with the specified implementation.
	pub fn new(implementation: Box<dyn CorrelatorInterface>) -> Self {
		Self { implementation }
	}

	/// Parses a notification body into a `PaymentNotice`.
	pub fn parse(&self, body: &serde_json::Value) -> Result<PaymentNotice, SettlementError> {
		self.implementation.parse(body)
	}
}
