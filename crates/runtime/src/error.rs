//! Error types for driver resolution.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while selecting a backend driver.
#[derive(Debug, Error)]
pub enum Error {
	/// `platformName` was absent or not a string.
	#[error("You must include a platformName capability")]
	MissingPlatform,

	/// No descriptor or platform rule matched the capabilities.
	#[error(
		"Could not find a driver for {}platformName '{platform}'. Please check your desired capabilities.",
		automation_name.as_ref().map(|name| format!("automationName '{name}' and ")).unwrap_or_default()
	)]
	UnknownPlatform {
		platform: String,
		automation_name: Option<String>,
	},

	/// The driver table or factory set is inconsistent.
	#[error("Invalid driver registry: {0}")]
	InvalidRegistry(String),
}

impl Error {
	/// Returns true when the request itself lacked what resolution needs.
	pub fn is_missing_capability(&self) -> bool {
		matches!(self, Error::MissingPlatform | Error::UnknownPlatform { .. })
	}
}
