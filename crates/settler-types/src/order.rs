//! Order types for the settlement engine.
//!
//! An order is the unit of settlement. It is created in `pending` state by
//! the order-creation collaborator, mutated only by this engine until it
//! reaches `confirmed`, and owned by the order-management collaborators from
//! then on. It is never deleted by this engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single product line captured at order creation time.
///
/// The unit price is a snapshot. Catalog price changes after the order
/// exists must not alter what the buyer owes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
	/// Reference to the purchased product.
	pub product_id: String,
	/// Number of units, at least 1.
	pub quantity: u32,
	/// Unit price at creation time, in the order's currency.
	pub unit_price: Decimal,
}

impl LineItem {
	/// Line subtotal: quantity times the snapshotted unit price.
	pub fn subtotal(&self) -> Decimal {
		Decimal::from(self.quantity) * self.unit_price
	}
}

/// The order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier, generated at creation, immutable.
	pub id: String,
	/// Identifier of the buying user; owned by the auth collaborator.
	pub buyer_id: String,
	/// Buyer contact for receipt dispatch, when known at creation.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub buyer_email: Option<String>,
	/// Product lines captured at creation time.
	pub line_items: Vec<LineItem>,
	/// Sum of line subtotals, computed once at creation and never
	/// recomputed from live product data.
	pub total_amount: Decimal,
	/// Settlement currency code.
	pub currency: String,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Payment network transaction identifier. Set once, on the first
	/// successful settlement, and never overwritten; this is the
	/// idempotency key for duplicate callbacks.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_reference: Option<String>,
	/// Delivery address captured at creation.
	pub shipping_address: String,
	/// Creation timestamp, unix seconds.
	pub created_at: u64,
	/// Last update timestamp, unix seconds.
	pub updated_at: u64,
}

impl Order {
	/// True while the order can still be settled by a payment callback.
	pub fn awaiting_payment(&self) -> bool {
		self.status == OrderStatus::Pending
	}
}

/// Status of an order in the settlement lifecycle.
///
/// Only the `Pending -> Confirmed` edge is driven by this engine; later
/// transitions belong to the order-management collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Created, awaiting payment.
	Pending,
	/// Payment confirmed by the payment network.
	Confirmed,
	/// Handed to fulfilment.
	Shipped,
	/// Delivered to the buyer.
	Delivered,
	/// Cancelled before fulfilment.
	Cancelled,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Pending => write!(f, "pending"),
			OrderStatus::Confirmed => write!(f, "confirmed"),
			OrderStatus::Shipped => write!(f, "shipped"),
			OrderStatus::Delivered => write!(f, "delivered"),
			OrderStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal::Decimal;

	#[test]
	fn test_line_item_subtotal() {
		let item = LineItem {
			product_id: "sku-1".to_string(),
			quantity: 3,
			unit_price: Decimal::new(2550, 2), // 25.50
		};
		assert_eq!(item.subtotal(), Decimal::new(7650, 2));
	}

	#[test]
	fn test_status_serializes_lowercase() {
		let json = serde_json::to_string(&OrderStatus::Confirmed).unwrap();
		assert_eq!(json, "\"confirmed\"");
		let back: OrderStatus = serde_json::from_str("\"pending\"").unwrap();
		assert_eq!(back, OrderStatus::Pending);
	}

	#[test]
	fn test_awaiting_payment() {
		let mut order = Order {
			id: "o1".to_string(),
			buyer_id: "b1".to_string(),
			buyer_email: None,
			line_items: vec![],
			total_amount: Decimal::ZERO,
			currency: "KES".to_string(),
			status: OrderStatus::Pending,
			payment_reference: None,
			shipping_address: "Nairobi".to_string(),
			created_at: 0,
			updated_at: 0,
		};
		assert!(order.awaiting_payment());
		order.status = OrderStatus::Confirmed;
		assert!(!order.awaiting_payment());
	}
}
