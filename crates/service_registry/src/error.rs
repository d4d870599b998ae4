//! Error types for registry operations and configuration loading.

use std::path::PathBuf;

use keel_table::TableError;
use thiserror::Error;

use crate::{BundleId, ServiceId};

/// Errors surfaced by [`crate::ServiceRegistry`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
	/// Services must be published under a non-empty name.
	#[error("service name must not be empty")]
	EmptyServiceName,

	/// Only the publishing bundle may unregister a service.
	#[error("service {service} is owned by {owner}, not {caller}")]
	NotOwner { service: ServiceId, owner: BundleId, caller: BundleId },

	/// An index could not grow.
	#[error("registry storage: {0}")]
	Storage(#[from] TableError),
}

/// Errors loading or validating a [`crate::RegistryConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {source}")]
	Read {
		/// Path to the file that failed to read.
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("config parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// The document parsed but holds an unusable value.
	#[error("invalid config: {0}")]
	Invalid(String),
}

/// Result type for registry operations.
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
