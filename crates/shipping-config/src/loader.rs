//! Multi-file configuration loading.
//!
//! A main file may pull in other files with `include`. Each top-level section
//! must come from exactly one file and a file may be loaded only once.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader that handles multi-file configurations with includes.
pub struct ConfigLoader {
	/// Base path for resolving relative includes
	base_path: PathBuf,
	/// Canonical paths already read, to reject circular includes
	loaded_files: HashSet<PathBuf>,
	/// Which file each top-level section came from, for error reporting
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads a configuration file and all its includes.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;

		let main_content = self.load_file(&config_path).await?;
		let main_toml: toml::Value = toml::from_str(&main_content)?;

		let includes = extract_includes(&main_toml)?;
		if includes.is_empty() {
			return Config::from_toml(main_toml);
		}

		let combined_toml = self
			.load_and_combine(main_toml, includes, config_path)
			.await?;
		Config::from_toml(combined_toml)
	}

	/// Reads a file, rejecting files that were already loaded.
	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical_path.display()
			)));
		}

		debug!("Loading configuration file {}", canonical_path.display());
		Ok(tokio::fs::read_to_string(path).await?)
	}

	async fn load_and_combine(
		&mut self,
		mut main_toml: toml::Value,
		includes: Vec<PathBuf>,
		main_file_path: PathBuf,
	) -> Result<toml::Value, ConfigError> {
		let main_table = main_toml
			.as_table_mut()
			.ok_or_else(|| ConfigError::Parse("Configuration root must be a table".into()))?;
		main_table.remove("include");

		for key in main_table.keys() {
			self.section_sources
				.insert(key.clone(), main_file_path.clone());
		}

		for include_path in includes {
			let resolved_path = self.resolve_path(&include_path)?;
			let include_content = self.load_file(&resolved_path).await?;
			let include_toml: toml::Value = toml::from_str(&include_content)?;

			let Some(include_table) = include_toml.as_table() else {
				continue;
			};

			for (key, value) in include_table {
				if let Some(existing_source) = self.section_sources.get(key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}. \
						Each top-level section must be unique across all configuration files.",
						key,
						existing_source.display(),
						resolved_path.display()
					)));
				}
				self.section_sources
					.insert(key.clone(), resolved_path.clone());
				main_table.insert(key.clone(), value.clone());
			}
		}

		Ok(main_toml)
	}

	/// Resolves a path relative to the base path and checks that it exists.
	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();

		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}

		Ok(resolved)
	}
}

/// Extracts `include` directives: either a single path or an array of paths.
///
/// Include paths may reference environment variables.
fn extract_includes(toml: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
	match toml.get("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(resolve_env_vars(path)?)]),
		Some(toml::Value::Array(items)) => items
			.iter()
			.map(|item| {
				let path = item.as_str().ok_or_else(|| {
					ConfigError::Validation("Include array must contain only strings".into())
				})?;
				Ok(PathBuf::from(resolve_env_vars(path)?))
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");

		let config_content = r#"
[shipping]
id = "shipping-test"

[order_service]
base_url = "http://localhost:8300/order-service/api/orders"

[transport]
primary = "http"
[transport.implementations.http]
timeout_seconds = 5
"#;
		fs::write(&config_path, config_content).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.shipping.id, "shipping-test");
		assert_eq!(config.transport.primary, "http");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();

		let main_config = r#"
include = ["order-service.toml", "transport.toml"]

[shipping]
id = "shipping-test"
"#;
		let order_service_config = r#"
[order_service]
base_url = "http://localhost:8300/order-service/api/orders"
"#;
		let transport_config = r#"
[transport]
primary = "mock"
[transport.implementations.mock]
"#;

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(
			temp_dir.path().join("order-service.toml"),
			order_service_config,
		)
		.unwrap();
		fs::write(temp_dir.path().join("transport.toml"), transport_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.shipping.id, "shipping-test");
		assert_eq!(config.transport.primary, "mock");
		assert_eq!(
			config.order_service.base_url,
			"http://localhost:8300/order-service/api/orders"
		);
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();

		let main_config = r#"
include = "duplicate.toml"

[shipping]
id = "shipping-test"
"#;
		let duplicate_config = r#"
[shipping]
id = "another-shipping"
"#;

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("duplicate.toml"), duplicate_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;

		let error_msg = result.unwrap_err().to_string();
		assert!(error_msg.contains("Duplicate section 'shipping'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();

		let config = r#"
include = ["self.toml"]

[shipping]
id = "shipping-test"
"#;
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("self.toml").await;

		let error_msg = result.unwrap_err().to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include_file() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = [\"absent.toml\"]\n[shipping]\nid = \"x\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
		assert!(err.to_string().contains("absent.toml"));
	}

	#[tokio::test]
	async fn test_env_values_resolved_once_across_includes() {
		let temp_dir = TempDir::new().unwrap();
		std::env::set_var("SHIPPING_LOADER_CALLER_TOKEN", "abc${SHIPPING_LOADER_NOT_SET}def");

		let main_config = r#"
include = ["order-service.toml"]

# ${SHIPPING_LOADER_COMMENTED_OUT} sits in a comment and is never resolved
[shipping]
id = "shipping-test"

[transport]
primary = "mock"
[transport.implementations.mock]
"#;
		let order_service_config = r#"
[order_service]
base_url = "http://localhost:8300/order-service/api/orders"

[order_service.default_headers]
X-Token = "${SHIPPING_LOADER_CALLER_TOKEN}"
"#;
		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(
			temp_dir.path().join("order-service.toml"),
			order_service_config,
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;
		std::env::remove_var("SHIPPING_LOADER_CALLER_TOKEN");

		let config = result.unwrap();
		assert_eq!(
			config.order_service.default_headers.get("X-Token").map(String::as_str),
			Some("abc${SHIPPING_LOADER_NOT_SET}def")
		);
	}

	#[test]
	fn test_include_path_from_env_default() {
		let value: toml::Value =
			toml::from_str(r#"include = "${SHIPPING_LOADER_UNSET_DIR:-conf}/api.toml""#).unwrap();
		assert_eq!(
			extract_includes(&value).unwrap(),
			vec![PathBuf::from("conf/api.toml")]
		);
	}

	#[test]
	fn test_include_must_be_strings() {
		let value: toml::Value = toml::from_str("include = [1, 2]").unwrap();
		assert!(extract_includes(&value).is_err());
	}
}
