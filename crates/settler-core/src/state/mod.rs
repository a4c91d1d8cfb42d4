//! Order state management.

mod order;

pub use order::{OrderStore, OrderStoreError, TransitionOutcome};
