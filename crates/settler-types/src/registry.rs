//! Registry trait for self-registering implementations.
//!
//! Pluggable components (storage backends, receipt notifiers) declare a
//! configuration name and a factory function through this trait, so the
//! service binary can wire implementations from configuration alone.

/// Base trait for implementation registries.
///
/// Each pluggable implementation module provides a `Registry` struct
/// implementing this trait, tying the name used in configuration files
/// (for example `storage.implementations.memory`) to a factory.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory for this implementation.
	fn factory() -> Self::Factory;
}
