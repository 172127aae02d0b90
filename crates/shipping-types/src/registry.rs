//! Registry trait for self-registering implementations.
//!
//! Every pluggable implementation exposes a `Registry` struct so the binary can
//! collect factories by the name used in configuration.

/// Base trait for implementation registries.
///
/// Each implementation module (`http`, `mock` transports) provides a Registry
/// struct implementing this trait, which declares its configuration name and
/// hands out a factory function.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// This matches the key under `transport.implementations`, for example
	/// `"http"` for `[transport.implementations.http]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
