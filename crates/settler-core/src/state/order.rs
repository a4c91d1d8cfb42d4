//! Order store and settlement state machine.
//!
//! The store owns order creation and the one transition this engine
//! drives: `pending -> confirmed`. The transition is conditional and
//! serialized per order, so two near-simultaneous duplicate callbacks
//! cannot both apply it; there is no lock shared across different orders.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use settler_types::{LineItem, Order, OrderStatus, StorageKey};
use settler_storage::StorageService;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors that can occur during order store operations.
#[derive(Debug, Error)]
pub enum OrderStoreError {
	/// No order exists with the given id.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The order payload is invalid.
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

/// Result of a conditional settlement transition.
#[derive(Debug)]
pub struct TransitionOutcome {
	/// True when this call performed the transition; false for the
	/// idempotent no-op on an already settled (or otherwise non-pending)
	/// order.
	pub applied: bool,
	/// The order after the call.
	pub order: Order,
}

/// Allowed status transitions.
///
/// Only `Pending -> Confirmed` is exercised by this engine; the rest of
/// the table documents the hand-off to the order-management collaborators
/// that own later transitions.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([OrderStatus::Confirmed, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Confirmed,
		HashSet::from([OrderStatus::Shipped, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Shipped, HashSet::from([OrderStatus::Delivered]));
	m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Checks if a status transition is allowed by the lifecycle table.
pub(crate) fn is_valid_transition(from: &OrderStatus, to: &OrderStatus) -> bool {
	TRANSITIONS.get(from).is_some_and(|set| set.contains(to))
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Authoritative store for order records.
pub struct OrderStore {
	storage: Arc<StorageService>,
	/// Per-order transition locks, created on first use.
	transition_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrderStore {
	/// Creates a new OrderStore over the given storage service.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			transition_locks: DashMap::new(),
		}
	}

	/// Creates a new order in `pending` state.
	///
	/// The total is computed here, once, from the snapshotted line items;
	/// it is never recomputed from live product data afterwards.
	pub async fn create_order(
		&self,
		buyer_id: String,
		buyer_email: Option<String>,
		line_items: Vec<LineItem>,
		shipping_address: String,
	) -> Result<Order, OrderStoreError> {
		if line_items.is_empty() {
			return Err(OrderStoreError::InvalidOrder(
				"order must contain at least one line item".to_string(),
			));
		}
		for item in &line_items {
			if item.quantity < 1 {
				return Err(OrderStoreError::InvalidOrder(format!(
					"quantity for product '{}' must be at least 1",
					item.product_id
				)));
			}
			if item.unit_price < Decimal::ZERO {
				return Err(OrderStoreError::InvalidOrder(format!(
					"unit price for product '{}' must not be negative",
					item.product_id
				)));
			}
		}

		let total_amount: Decimal = line_items.iter().map(LineItem::subtotal).sum();
		let now = unix_now();

		let order = Order {
			id: uuid::Uuid::new_v4().to_string(),
			buyer_id,
			buyer_email,
			line_items,
			total_amount,
			currency: "KES".to_string(),
			status: OrderStatus::Pending,
			payment_reference: None,
			shipping_address,
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await
			.map_err(|e| OrderStoreError::Storage(e.to_string()))?;

		tracing::info!(order_id = %order.id, total = %order.total_amount, "Order created");
		Ok(order)
	}

	/// Retrieves an order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStoreError> {
		match self
			.storage
			.retrieve::<Order>(StorageKey::Orders.as_str(), order_id)
			.await
		{
			Ok(order) => Ok(order),
			Err(settler_storage::StorageError::NotFound) => {
				Err(OrderStoreError::NotFound(order_id.to_string()))
			},
			Err(e) => Err(OrderStoreError::Storage(e.to_string())),
		}
	}

	/// Applies the settlement transition: confirmed only if still pending.
	///
	/// Serialized per order, so concurrent duplicate callbacks resolve to
	/// exactly one applied transition. The no-op branch leaves the stored
	/// payment reference untouched.
	pub async fn transition_to_confirmed(
		&self,
		order_id: &str,
		payment_reference: &str,
	) -> Result<TransitionOutcome, OrderStoreError> {
		let lock = self
			.transition_locks
			.entry(order_id.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.clone();
		let _guard = lock.lock().await;

		let mut order = self.get_order(order_id).await?;

		if !is_valid_transition(&order.status, &OrderStatus::Confirmed) {
			return Ok(TransitionOutcome {
				applied: false,
				order,
			});
		}

		order.status = OrderStatus::Confirmed;
		order.payment_reference = Some(payment_reference.to_string());
		order.updated_at = unix_now();

		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| OrderStoreError::Storage(e.to_string()))?;

		tracing::info!(
			order_id = %order.id,
			payment_reference = %payment_reference,
			"Order confirmed"
		);

		Ok(TransitionOutcome {
			applied: true,
			order,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use settler_storage::implementations::memory::MemoryStorage;

	fn store() -> OrderStore {
		OrderStore::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	fn items(price: i64, quantity: u32) -> Vec<LineItem> {
		vec![LineItem {
			product_id: "sku-1".to_string(),
			quantity,
			unit_price: Decimal::from(price),
		}]
	}

	#[tokio::test]
	async fn test_create_computes_total_once() {
		let store = store();
		let order = store
			.create_order("b1".to_string(), None, items(100, 2), "Nairobi".to_string())
			.await
			.unwrap();

		assert_eq!(order.total_amount, Decimal::from(200));
		assert_eq!(order.status, OrderStatus::Pending);
		assert!(order.payment_reference.is_none());
	}

	#[tokio::test]
	async fn test_create_rejects_bad_items() {
		let store = store();
		assert!(matches!(
			store
				.create_order("b1".to_string(), None, vec![], "Nairobi".to_string())
				.await,
			Err(OrderStoreError::InvalidOrder(_))
		));
		assert!(matches!(
			store
				.create_order("b1".to_string(), None, items(100, 0), "Nairobi".to_string())
				.await,
			Err(OrderStoreError::InvalidOrder(_))
		));
		assert!(matches!(
			store
				.create_order("b1".to_string(), None, items(-1, 1), "Nairobi".to_string())
				.await,
			Err(OrderStoreError::InvalidOrder(_))
		));
	}

	#[tokio::test]
	async fn test_get_missing_order() {
		let store = store();
		assert!(matches!(
			store.get_order("missing").await,
			Err(OrderStoreError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_transition_applies_once() {
		let store = store();
		let order = store
			.create_order("b1".to_string(), None, items(100, 2), "Nairobi".to_string())
			.await
			.unwrap();

		let first = store
			.transition_to_confirmed(&order.id, "ws_CO_1")
			.await
			.unwrap();
		assert!(first.applied);
		assert_eq!(first.order.status, OrderStatus::Confirmed);
		assert_eq!(first.order.payment_reference.as_deref(), Some("ws_CO_1"));

		let second = store
			.transition_to_confirmed(&order.id, "ws_CO_2")
			.await
			.unwrap();
		assert!(!second.applied);
		// The payment reference from the first settlement survives.
		assert_eq!(second.order.payment_reference.as_deref(), Some("ws_CO_1"));
	}

	#[tokio::test]
	async fn test_concurrent_duplicates_apply_once() {
		let store = Arc::new(store());
		let order = store
			.create_order("b1".to_string(), None, items(100, 2), "Nairobi".to_string())
			.await
			.unwrap();

		let mut handles = Vec::new();
		for i in 0..8 {
			let store = Arc::clone(&store);
			let order_id = order.id.clone();
			handles.push(tokio::spawn(async move {
				store
					.transition_to_confirmed(&order_id, &format!("ws_CO_{}", i))
					.await
					.unwrap()
					.applied
			}));
		}

		let mut applied = 0;
		for handle in handles {
			if handle.await.unwrap() {
				applied += 1;
			}
		}
		assert_eq!(applied, 1);
	}

	#[test]
	fn test_transition_table() {
		use super::is_valid_transition;
		assert!(is_valid_transition(&OrderStatus::Pending, &OrderStatus::Confirmed));
		assert!(is_valid_transition(&OrderStatus::Pending, &OrderStatus::Cancelled));
		assert!(!is_valid_transition(&OrderStatus::Confirmed, &OrderStatus::Confirmed));
		assert!(!is_valid_transition(&OrderStatus::Cancelled, &OrderStatus::Confirmed));
		assert!(!is_valid_transition(&OrderStatus::Delivered, &OrderStatus::Pending));
	}
}
