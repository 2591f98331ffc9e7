//! Vendor namespace bookkeeping for capability names.
//!
//! W3C requires every non-standard capability to carry a vendor prefix. The
//! legacy format never did, so names move between `deviceName` and
//! `appium:deviceName` depending on which side of the negotiation they are on.

use serde_json::Value;

use crate::types::Capabilities;

/// Vendor namespace used for non-standard capability names.
pub const VENDOR_PREFIX: &str = "appium";

const PREFIX_WITH_COLON: &str = "appium:";

/// Capability names defined by the W3C WebDriver specification.
pub const STANDARD_CAPABILITIES: [&str; 9] = [
	"browserName",
	"browserVersion",
	"platformName",
	"acceptInsecureCerts",
	"pageLoadStrategy",
	"proxy",
	"setWindowRect",
	"timeouts",
	"unhandledPromptBehavior",
];

/// Returns `true` for names the W3C specification leaves unprefixed.
pub fn is_standard_capability(name: &str) -> bool {
	STANDARD_CAPABILITIES.contains(&name)
}

/// Prefixes every non-standard, un-namespaced key with `appium:`.
///
/// Keys that already contain a colon belong to some vendor and are kept as-is.
pub fn insert_vendor_prefixes(caps: &Capabilities) -> Capabilities {
	caps.iter()
		.map(|(name, value)| {
			let key = if is_standard_capability(name) || name.contains(':') {
				name.clone()
			} else {
				format!("{PREFIX_WITH_COLON}{name}")
			};
			(key, value.clone())
		})
		.collect()
}

/// Removes a leading `appium:` from a single capability name.
pub fn strip_vendor_prefix(name: &str) -> &str {
	name.strip_prefix(PREFIX_WITH_COLON).unwrap_or(name)
}

/// Removes `appium:` from every key of a capability map.
pub fn strip_vendor_prefixes_map(caps: &Capabilities) -> Capabilities {
	caps.iter()
		.map(|(name, value)| (strip_vendor_prefix(name).to_string(), value.clone()))
		.collect()
}

/// Removes `appium:` from every key when `value` is an object.
///
/// Any other JSON value is returned unchanged.
pub fn strip_vendor_prefixes(value: &Value) -> Value {
	match value {
		Value::Object(caps) => Value::Object(strip_vendor_prefixes_map(caps)),
		other => other.clone(),
	}
}
