//! Configuration module for the shipping service.
//!
//! Configuration is read from TOML. String values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`, which is how the order service
//! location is usually supplied at deploy time.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shipping_types::is_http_url;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message only; the default Display dumps the whole input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the shipping service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this shipping service instance.
	pub shipping: ShippingConfig,
	/// Location of the order service.
	pub order_service: OrderServiceConfig,
	/// Transport used to reach the order service.
	pub transport: TransportConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the shipping instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShippingConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
}

/// Where orders are fetched from.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrderServiceConfig {
	/// Base URL of the orders collection; an order lives at `{base_url}/{orderId}`.
	pub base_url: String,
	/// Headers sent with every request to the order service.
	#[serde(default)]
	pub default_headers: HashMap<String, String>,
}

/// Configuration for the transport layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of transport implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

impl TransportConfig {
	/// Returns the configuration table of the primary implementation.
	pub fn primary_config(&self) -> Option<&toml::Value> {
		self.implementations.get(&self.primary)
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Host address to bind the server to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind the server to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8600
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}. Substituted values
/// are not scanned again.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

/// Resolves environment variables in every string value of a TOML tree.
///
/// Keys and comments are left untouched.
fn resolve_env_vars_in(value: &mut toml::Value) -> Result<(), ConfigError> {
	match value {
		toml::Value::String(s) if s.contains("${") => {
			*s = resolve_env_vars(s)?;
		},
		toml::Value::Array(items) => {
			for item in items.iter_mut() {
				resolve_env_vars_in(item)?;
			}
		},
		toml::Value::Table(table) => {
			for (_, item) in table.iter_mut() {
				resolve_env_vars_in(item)?;
			}
		},
		_ => {},
	}
	Ok(())
}

impl Config {
	/// Builds a configuration from a parsed TOML document.
	///
	/// Environment variables are resolved here, once, then the result is
	/// deserialized and validated.
	pub(crate) fn from_toml(mut value: toml::Value) -> Result<Self, ConfigError> {
		resolve_env_vars_in(&mut value)?;
		let config: Config = value.try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a file, following `include` directives.
	///
	/// Each top-level section must be unique across all configuration files.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates cross-field constraints that serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.shipping.id.is_empty() {
			return Err(ConfigError::Validation(
				"Shipping ID cannot be empty".into(),
			));
		}

		if !is_http_url(&self.order_service.base_url) {
			return Err(ConfigError::Validation(format!(
				"order_service.base_url must be an http(s) URL, got '{}'",
				self.order_service.base_url
			)));
		}
		for (name, value) in &self.order_service.default_headers {
			if name.is_empty() || value.contains(['\r', '\n']) {
				return Err(ConfigError::Validation(format!(
					"Invalid default header '{}'",
					name
				)));
			}
		}

		if self.transport.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one transport implementation must be configured".into(),
			));
		}
		if self.transport.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Transport primary implementation cannot be empty".into(),
			));
		}
		if self.transport.primary_config().is_none() {
			return Err(ConfigError::Validation(format!(
				"Primary transport '{}' not found in implementations",
				self.transport.primary
			)));
		}

		if let Some(ref api) = self.api {
			if api.enabled && api.host.is_empty() {
				return Err(ConfigError::Validation(
					"API host cannot be empty when the API is enabled".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value: toml::Value = toml::from_str(s)?;
		Config::from_toml(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const MINIMAL: &str = r#"
[shipping]
id = "shipping-service"

[order_service]
base_url = "http://localhost:8300/order-service/api/orders"

[transport]
primary = "http"
[transport.implementations.http]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("SHIPPING_TEST_HOST", "order-service");
		std::env::set_var("SHIPPING_TEST_PORT", "8300");

		let input = "base_url = \"http://${SHIPPING_TEST_HOST}:${SHIPPING_TEST_PORT}/api\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "base_url = \"http://order-service:8300/api\"");

		std::env::remove_var("SHIPPING_TEST_HOST");
		std::env::remove_var("SHIPPING_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${SHIPPING_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${SHIPPING_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("SHIPPING_MISSING_VAR"));
	}

	#[test]
	fn test_minimal_config() {
		let config: Config = MINIMAL.parse().unwrap();

		assert_eq!(config.shipping.id, "shipping-service");
		assert_eq!(
			config.order_service.base_url,
			"http://localhost:8300/order-service/api/orders"
		);
		assert!(config.order_service.default_headers.is_empty());
		assert!(config.api.is_none());

		assert_eq!(config.transport.primary, "http");
		assert!(config.transport.primary_config().is_some());
	}

	#[test]
	fn test_env_value_is_not_expanded_twice() {
		std::env::set_var("SHIPPING_TEST_CALLER_TOKEN", "abc${SHIPPING_TEST_NOT_SET}def");

		let config_str = format!(
			"{}\n[order_service.default_headers]\nX-Token = \"${{SHIPPING_TEST_CALLER_TOKEN}}\"\n",
			MINIMAL
		);
		let config = Config::from_str(&config_str);

		std::env::remove_var("SHIPPING_TEST_CALLER_TOKEN");
		let config = config.unwrap();
		assert_eq!(
			config.order_service.default_headers.get("X-Token").map(String::as_str),
			Some("abc${SHIPPING_TEST_NOT_SET}def")
		);
	}

	#[test]
	fn test_env_reference_in_comment_is_ignored() {
		let config_str = format!(
			"# base_url = \"${{SHIPPING_TEST_COMMENTED_OUT}}\"\n{}",
			MINIMAL
		);
		assert!(Config::from_str(&config_str).is_ok());
	}

	#[test]
	fn test_base_url_from_env_default() {
		let config_str = r#"
[shipping]
id = "shipping-service"

[order_service]
base_url = "${SHIPPING_UNSET_ORDER_URL:-http://ORDER-SERVICE/order-service/api/orders}"

[transport]
primary = "http"
[transport.implementations.http]

[api]
enabled = true
"#;
		let config: Config = config_str.parse().unwrap();
		assert_eq!(
			config.order_service.base_url,
			"http://ORDER-SERVICE/order-service/api/orders"
		);

		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.host, "127.0.0.1");
		assert_eq!(api.port, 8600);
	}

	#[test]
	fn test_invalid_base_url_rejected() {
		let config_str = MINIMAL.replace("http://localhost:8300", "localhost:8300");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("order_service.base_url"));
	}

	#[test]
	fn test_unknown_primary_transport_rejected() {
		let config_str = MINIMAL.replace("primary = \"http\"", "primary = \"mock\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary transport 'mock' not found in implementations"));
	}

	#[test]
	fn test_empty_shipping_id_rejected() {
		let config_str = MINIMAL.replace("\"shipping-service\"", "\"\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("Shipping ID cannot be empty"));
	}

	#[test]
	fn test_missing_section_is_parse_error() {
		let err = Config::from_str("[shipping]\nid = \"x\"").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}
}
