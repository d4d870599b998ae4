//! Registry configuration.
//!
//! Loaded from TOML; every field is optional and unknown keys are rejected:
//!
//! ```toml
//! first_service_id = 1
//! listener_hook_service = "listener_hook_service"
//! initial_capacity = 16
//! ```

use std::path::Path;

use keel_table::MAXIMUM_CAPACITY;
use serde::Deserialize;

use crate::ConfigError;

/// Name under which listener hooks are conventionally published.
pub const LISTENER_HOOK_SERVICE: &str = "listener_hook_service";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	/// Id handed to the first registration.
	pub first_service_id: u64,
	/// Registrations published under this name are also kept in the hooks index.
	pub listener_hook_service: String,
	/// Initial bucket count of the registry's tables, rounded up to a power of two.
	pub initial_capacity: usize,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			first_service_id: 1,
			listener_hook_service: LISTENER_HOOK_SERVICE.to_owned(),
			initial_capacity: keel_table::DEFAULT_INITIAL_CAPACITY,
		}
	}
}

impl RegistryConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(source)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		let config = Self::from_toml_str(&source)?;
		tracing::debug!(path = %path.display(), "loaded registry config");
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.first_service_id == 0 {
			return Err(ConfigError::Invalid("first_service_id must be at least 1".into()));
		}
		if self.listener_hook_service.trim().is_empty() {
			return Err(ConfigError::Invalid("listener_hook_service must not be empty".into()));
		}
		if self.initial_capacity == 0 || self.initial_capacity > MAXIMUM_CAPACITY {
			return Err(ConfigError::Invalid(format!(
				"initial_capacity must be within 1..={MAXIMUM_CAPACITY}, got {}",
				self.initial_capacity
			)));
		}
		Ok(())
	}
}
