//! Common types module for the shipping service.
//!
//! This module defines the data types shared by the shipping crates: the order
//! record returned by the order service, the transport-level request and
//! response values, and the configuration validation framework used by
//! pluggable implementations.

/// Order records as served by the order service.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Transport-level HTTP request and response values.
pub mod transport;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use order::*;
pub use registry::ImplementationRegistry;
pub use transport::{HttpRequest, HttpResponse, APPLICATION_JSON};
pub use validation::*;
