//! Event bus for inter-service communication.
//!
//! A thin wrapper over a tokio broadcast channel. Publishing never blocks,
//! which is what keeps the callback acknowledgment independent of receipt
//! dispatch: handlers publish and return, and the engine's event loop
//! reacts on its own schedule.

use settler_types::SettlerEvent;
use tokio::sync::broadcast;

/// Default buffered event capacity.
const DEFAULT_CAPACITY: usize = 128;

/// Broadcast bus carrying [`SettlerEvent`]s between engine components.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SettlerEvent>,
}

impl EventBus {
	/// Creates a bus with the given buffered capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error only when no subscriber exists; callers that do
	/// not care (fire-and-forget publication) can ignore it.
	pub fn publish(
		&self,
		event: SettlerEvent,
	) -> Result<usize, broadcast::error::SendError<SettlerEvent>> {
		self.sender.send(event)
	}

	/// Creates a new subscription receiving events published after this
	/// call.
	pub fn subscribe(&self) -> broadcast::Receiver<SettlerEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use settler_types::{SettlementEvent, SettlerEvent};

	#[tokio::test]
	async fn test_publish_reaches_subscriber() {
		let bus = EventBus::default();
		let mut rx = bus.subscribe();

		bus.publish(SettlerEvent::Settlement(SettlementEvent::Duplicate {
			order_id: "o1".to_string(),
		}))
		.unwrap();

		let event = rx.recv().await.unwrap();
		assert!(matches!(
			event,
			SettlerEvent::Settlement(SettlementEvent::Duplicate { order_id }) if order_id == "o1"
		));
	}

	#[test]
	fn test_publish_without_subscribers_errors() {
		let bus = EventBus::default();
		assert!(bus
			.publish(SettlerEvent::Settlement(SettlementEvent::Duplicate {
				order_id: "o1".to_string(),
			}))
			.is_err());
	}
}
