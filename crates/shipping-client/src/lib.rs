//! Order service client for the shipping service.
//!
//! This crate provides the client the shipping service uses to read orders
//! from the order service. The network is reached through the
//! [`TransportInterface`] seam so the production `http` transport can be
//! swapped for the in-memory `mock` transport in tests or local runs.

use async_trait::async_trait;
use shipping_config::TransportConfig;
use shipping_types::{ConfigSchema, HttpRequest, HttpResponse, ImplementationRegistry};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

mod order_client;
mod rest;

pub use order_client::OrderServiceClient;
pub use rest::{ClientError, RestClient};

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur while sending a request.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
	/// The request could not be delivered or the response could not be read.
	#[error("Network error: {0}")]
	Network(String),
	/// A mock transport received a request no pending expectation matched.
	#[error("No expectation matched request: {0}")]
	Unexpected(String),
	/// The transport configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for transports.
///
/// A transport delivers one request and returns the raw response, whatever its
/// status. Interpreting the status is left to the caller.
#[async_trait]
pub trait TransportInterface: Send + Sync {
	/// Returns the configuration schema for this transport implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Sends a request and waits for the complete response.
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Type alias for transport factory functions.
pub type TransportFactory =
	fn(&toml::Value) -> Result<Box<dyn TransportInterface>, TransportError>;

/// Registry trait for transport implementations.
pub trait TransportRegistry: ImplementationRegistry<Factory = TransportFactory> {}

/// Get all registered transport implementations.
///
/// Returns a vector of (name, factory) tuples for all available transports.
pub fn get_all_implementations() -> Vec<(&'static str, TransportFactory)> {
	use implementations::{http, mock};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
	]
}

/// Builds the primary transport named in the configuration.
///
/// The implementation table is checked against the transport's own schema
/// before the transport is handed out.
pub fn create_primary_transport(
	config: &TransportConfig,
) -> Result<Arc<dyn TransportInterface>, TransportError> {
	let implementation_config = config.primary_config().ok_or_else(|| {
		TransportError::Configuration(format!(
			"Primary transport '{}' has no configuration",
			config.primary
		))
	})?;

	let factory = get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == config.primary)
		.map(|(_, factory)| factory)
		.ok_or_else(|| {
			TransportError::Configuration(format!("Unknown transport '{}'", config.primary))
		})?;

	let transport = factory(implementation_config)?;
	transport
		.config_schema()
		.validate(implementation_config)
		.map_err(|e| {
			TransportError::Configuration(format!(
				"Invalid configuration for transport '{}': {}",
				config.primary, e
			))
		})?;
	info!(transport = %config.primary, "Created transport");
	Ok(Arc::from(transport))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn transport_config(primary: &str, implementations: &[&str]) -> TransportConfig {
		TransportConfig {
			primary: primary.to_string(),
			implementations: implementations
				.iter()
				.map(|name| {
					(
						name.to_string(),
						toml::Value::Table(toml::map::Map::new()),
					)
				})
				.collect::<HashMap<_, _>>(),
		}
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<&str> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["http", "mock"]);
	}

	#[test]
	fn test_create_primary_transport() {
		let config = transport_config("mock", &["http", "mock"]);
		assert!(create_primary_transport(&config).is_ok());
	}

	#[test]
	fn test_primary_table_checked_against_schema() {
		let mut config = transport_config("http", &["http"]);
		config.implementations.insert(
			"http".to_string(),
			toml::from_str("timeout_seconds = 0").unwrap(),
		);

		let err = create_primary_transport(&config).err().unwrap();
		assert!(matches!(
			err,
			TransportError::Configuration(msg)
				if msg.contains("transport 'http'") && msg.contains("timeout_seconds")
		));
	}

	#[test]
	fn test_unknown_transport_rejected() {
		let config = transport_config("grpc", &["grpc"]);
		let err = create_primary_transport(&config).err().unwrap();
		assert_eq!(
			err,
			TransportError::Configuration("Unknown transport 'grpc'".to_string())
		);
	}

	#[test]
	fn test_missing_primary_configuration() {
		let config = transport_config("http", &["mock"]);
		assert!(matches!(
			create_primary_transport(&config),
			Err(TransportError::Configuration(_))
		));
	}
}
