//! Gateway configuration.

use serde::{Deserialize, Serialize};
use wdgate_protocol::Capabilities;

use crate::validation::Constraints;

/// Settings fixed for the lifetime of a [`SessionGateway`](crate::SessionGateway).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
	/// Capabilities merged underneath every request.
	pub default_capabilities: Capabilities,
	/// Delete every active session before creating a new one.
	pub session_override: bool,
	/// Constraints applied during strict W3C processing.
	pub constraints: Constraints,
}

impl GatewayConfig {
	pub fn with_default_capabilities(mut self, defaults: Capabilities) -> Self {
		self.default_capabilities = defaults;
		self
	}

	pub fn with_session_override(mut self, enabled: bool) -> Self {
		self.session_override = enabled;
		self
	}

	pub fn with_constraints(mut self, constraints: Constraints) -> Self {
		self.constraints = constraints;
		self
	}
}
