//! Common types for the settlement engine.
//!
//! This crate defines the data types shared across the engine's crates:
//! the order record, the correlation reference, the payment network's
//! callback envelope, API request/response types, engine events, and the
//! configuration validation utilities used by pluggable implementations.

/// API types for the HTTP surface and the structured API error.
pub mod api;
/// Inbound payment-network callback envelope.
pub mod callback;
/// Engine events carried on the event bus.
pub mod events;
/// Order record, line items, and lifecycle status.
pub mod order;
/// Correlation reference construction and extraction.
pub mod reference;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Secure string type for credentials.
pub mod secret_string;
/// Storage namespace keys.
pub mod storage;
/// Configuration validation schemas.
pub mod validation;

pub use api::*;
pub use callback::*;
pub use events::*;
pub use order::*;
pub use reference::{build_reference, extract_order_id, REFERENCE_PREFIX};
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::StorageKey;
pub use validation::*;
