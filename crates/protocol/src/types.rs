//! Capability payloads, protocol tags, and session listing types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::namespace::insert_vendor_prefixes;

/// A capability set: string keys to arbitrary JSON values.
pub type Capabilities = serde_json::Map<String, Value>;

/// Wire protocol a session response must speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
	/// Standardized W3C WebDriver protocol.
	#[serde(rename = "W3C")]
	W3c,
	/// Legacy JSON Wire Protocol (flat desired capabilities).
	#[serde(rename = "MJSONWP")]
	Legacy,
}

impl Protocol {
	/// Returns the wire label for this protocol.
	pub fn as_str(self) -> &'static str {
		match self {
			Protocol::W3c => "W3C",
			Protocol::Legacy => "MJSONWP",
		}
	}
}

impl std::fmt::Display for Protocol {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// W3C capabilities object as forwarded to a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct W3cCapabilities {
	#[serde(default)]
	pub always_match: Capabilities,
	#[serde(default)]
	pub first_match: Vec<Capabilities>,
}

impl W3cCapabilities {
	/// Collapses resolved capabilities into `alwaysMatch` with a trivial `firstMatch`.
	///
	/// Non-standard names regain the vendor prefix, so the result is valid W3C
	/// regardless of how the original request was shaped.
	pub fn collapsed(resolved: &Capabilities) -> Self {
		Self {
			always_match: insert_vendor_prefixes(resolved),
			first_match: vec![Capabilities::new()],
		}
	}

	/// Converts into a JSON value.
	pub fn to_value(&self) -> Value {
		let mut object = serde_json::Map::new();
		object.insert("alwaysMatch".to_string(), Value::Object(self.always_match.clone()));
		object.insert(
			"firstMatch".to_string(),
			Value::Array(self.first_match.iter().cloned().map(Value::Object).collect()),
		);
		Value::Object(object)
	}
}

/// Entry returned when listing active sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
	pub id: String,
	pub capabilities: Value,
}

/// Static build metadata reported by the gateway status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
	pub version: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub git_sha: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub built: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
	pub build: BuildInfo,
}
