//! Network transport backed by `reqwest`.
//!
//! One pooled client is shared by every request. Non-2xx responses are
//! returned as-is; only failures to connect, send, or read the body become
//! errors.

use crate::{TransportError, TransportFactory, TransportInterface, TransportRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shipping_types::{
	ConfigSchema, Field, FieldType, HttpRequest, HttpResponse, ImplementationRegistry, Schema,
	ValidationError,
};
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
	/// Total time allowed for one request, in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
	/// How long idle pooled connections are kept, in seconds.
	#[serde(default = "default_pool_idle_timeout_seconds")]
	pub pool_idle_timeout_seconds: u64,
	/// Maximum idle connections kept per host.
	#[serde(default = "default_pool_max_idle_per_host")]
	pub pool_max_idle_per_host: usize,
	/// Value of the `User-Agent` header, if any.
	#[serde(default)]
	pub user_agent: Option<String>,
}

fn default_timeout_seconds() -> u64 {
	30
}

fn default_pool_idle_timeout_seconds() -> u64 {
	90
}

fn default_pool_max_idle_per_host() -> usize {
	10
}

impl Default for HttpTransportConfig {
	fn default() -> Self {
		Self {
			timeout_seconds: default_timeout_seconds(),
			pool_idle_timeout_seconds: default_pool_idle_timeout_seconds(),
			pool_max_idle_per_host: default_pool_max_idle_per_host(),
			user_agent: None,
		}
	}
}

/// Configuration schema for HttpTransport.
pub struct HttpTransportSchema;

impl ConfigSchema for HttpTransportSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
				Field::new(
					"pool_idle_timeout_seconds",
					FieldType::Integer {
						min: Some(0),
						max: Some(3600),
					},
				),
				Field::new(
					"pool_max_idle_per_host",
					FieldType::Integer {
						min: Some(0),
						max: Some(1024),
					},
				),
				Field::new("user_agent", FieldType::String),
			],
		);
		schema.validate(config)
	}
}

/// Transport that sends requests over the network.
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
		let mut builder = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_seconds))
			.pool_max_idle_per_host(config.pool_max_idle_per_host)
			.timeout(Duration::from_secs(config.timeout_seconds));
		if let Some(user_agent) = &config.user_agent {
			builder = builder.user_agent(user_agent.clone());
		}

		let client = builder
			.build()
			.map_err(|e| TransportError::Configuration(format!("Failed to build client: {}", e)))?;

		Ok(Self { client })
	}
}

#[async_trait]
impl TransportInterface for HttpTransport {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpTransportSchema)
	}

	#[instrument(skip_all, fields(method = %request.method, url = %request.url))]
	async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
		let mut builder = self
			.client
			.request(request.method, &request.url)
			.headers(request.headers);
		if let Some(body) = request.body {
			builder = builder.body(body);
		}

		let response = builder
			.send()
			.await
			.map_err(|e| TransportError::Network(e.to_string()))?;

		let status = response.status();
		let headers = response.headers().clone();
		let body = response
			.bytes()
			.await
			.map_err(|e| TransportError::Network(format!("Failed to read body: {}", e)))?;
		debug!(%status, bytes = body.len(), "Response received");

		Ok(HttpResponse {
			status,
			headers,
			body,
		})
	}
}

/// Registry for the HTTP transport implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = TransportFactory;

	fn factory() -> Self::Factory {
		|config: &toml::Value| -> Result<Box<dyn TransportInterface>, TransportError> {
			let http_config: HttpTransportConfig = config
				.clone()
				.try_into()
				.map_err(|e| TransportError::Configuration(format!("Invalid http config: {}", e)))?;

			Ok(Box::new(HttpTransport::new(http_config)?))
		}
	}
}

impl TransportRegistry for Registry {}
