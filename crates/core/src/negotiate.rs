//! Legacy/W3C capability reconciliation.
//!
//! Clients may send flat legacy capabilities, a W3C payload, or both. This
//! module decides which protocol the session speaks and produces the single
//! canonical capability set used to pick and configure a backend, plus the
//! mirrors each format expects to receive.

#[cfg(test)]
mod tests;

use serde_json::Value;
use tracing::{debug, info, warn};
use wdgate_protocol::{
	Capabilities, Protocol, VENDOR_PREFIX, W3cCapabilities, strip_vendor_prefix, strip_vendor_prefixes_map,
};

use crate::error::{Error, Result};
use crate::validation::{CapabilityValidator, Constraints};

/// Inputs to [`negotiate`]. Nothing here is mutated.
#[derive(Debug, Clone, Copy)]
pub struct NegotiationRequest<'a> {
	/// Legacy desired capabilities as received.
	pub legacy: Option<&'a Value>,
	/// W3C capabilities payload as received.
	pub w3c: Option<&'a Value>,
	pub constraints: &'a Constraints,
	/// Capabilities applied underneath whatever the client sent.
	pub defaults: &'a Capabilities,
}

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Negotiation {
	pub protocol: Protocol,
	/// Canonical, unprefixed capabilities for driver selection.
	pub capabilities: Capabilities,
	/// Legacy mirror, present whenever the client sent legacy capabilities.
	pub legacy: Option<Capabilities>,
	/// W3C mirror, present whenever W3C processing succeeded.
	pub w3c: Option<W3cCapabilities>,
}

fn has_w3c_sections(value: &Value) -> bool {
	value
		.as_object()
		.is_some_and(|caps| caps.contains_key("alwaysMatch") || caps.contains_key("firstMatch"))
}

/// Reconciles legacy and W3C capabilities into one canonical set.
///
/// W3C wins when both are present and valid. If the W3C payload is invalid
/// or loses legacy keys, it is repaired from the legacy set and retried once;
/// a second failure falls back to the legacy protocol without an error.
pub async fn negotiate(validator: &dyn CapabilityValidator, request: &NegotiationRequest<'_>) -> Result<Negotiation> {
	let legacy = request.legacy.and_then(Value::as_object).cloned();
	let w3c = request.w3c.filter(|value| has_w3c_sections(value)).cloned();

	let (legacy, mut payload) = match (legacy, w3c) {
		(None, None) => return Err(Error::CapabilitiesMissing),
		(Some(caps), None) => return Ok(legacy_negotiation(with_legacy_defaults(caps, request.defaults))),
		(legacy, Some(payload)) => (legacy.map(|caps| with_legacy_defaults(caps, request.defaults)), payload),
	};
	if !request.defaults.is_empty() {
		apply_w3c_defaults(&mut payload, request.defaults);
	}

	let processed = validator.process(&payload, request.constraints, true).await;
	let Some(legacy) = legacy else {
		return Ok(w3c_negotiation(processed?, None));
	};

	match processed {
		Ok(resolved) => {
			let missing = missing_legacy_names(&legacy, &resolved);
			if missing.is_empty() {
				return Ok(w3c_negotiation(resolved, Some(legacy)));
			}
			info!(
				target = "wdgate.negotiate",
				missing = ?missing,
				"legacy capabilities are missing from W3C capabilities"
			);
		}
		Err(err) => info!(target = "wdgate.negotiate", error = %err, "could not parse W3C capabilities"),
	}

	info!(target = "wdgate.negotiate", "repairing W3C capabilities from legacy capabilities");
	let repaired = repair_w3c_capabilities(&payload, &legacy);
	match validator.process(&repaired, request.constraints, true).await {
		Ok(fixed) => Ok(w3c_negotiation(fixed, Some(legacy))),
		Err(err) => {
			warn!(
				target = "wdgate.negotiate",
				error = %err,
				"could not parse repaired W3C capabilities; falling back to legacy protocol"
			);
			Ok(legacy_negotiation(legacy))
		}
	}
}

fn legacy_negotiation(caps: Capabilities) -> Negotiation {
	debug!(target = "wdgate.negotiate", protocol = %Protocol::Legacy, "negotiated legacy capabilities");
	Negotiation {
		protocol: Protocol::Legacy,
		capabilities: caps.clone(),
		legacy: Some(caps),
		w3c: None,
	}
}

fn w3c_negotiation(capabilities: Capabilities, legacy: Option<Capabilities>) -> Negotiation {
	debug!(target = "wdgate.negotiate", protocol = %Protocol::W3c, "negotiated W3C capabilities");
	Negotiation {
		protocol: Protocol::W3c,
		w3c: Some(W3cCapabilities::collapsed(&capabilities)),
		capabilities,
		legacy,
	}
}

/// Defaults sit underneath the client's own legacy capabilities.
fn with_legacy_defaults(caps: Capabilities, defaults: &Capabilities) -> Capabilities {
	if defaults.is_empty() {
		return caps;
	}
	let mut merged = strip_vendor_prefixes_map(defaults);
	merged.extend(caps);
	merged
}

/// Legacy names, unprefixed, that the resolved W3C set does not carry.
fn missing_legacy_names<'a>(legacy: &'a Capabilities, resolved: &Capabilities) -> Vec<&'a str> {
	let resolved_names = strip_vendor_prefixes_map(resolved);
	legacy
		.keys()
		.map(|name| strip_vendor_prefix(name))
		.filter(|name| !resolved_names.contains_key(*name))
		.collect()
}

/// Places defaults the W3C payload does not already set into `firstMatch`.
fn apply_w3c_defaults(payload: &mut Value, defaults: &Capabilities) {
	let Some(sections) = payload.as_object_mut() else {
		return;
	};
	for (name, value) in defaults {
		let wanted = strip_vendor_prefix(name);
		let sets = |section: &Value| {
			section
				.as_object()
				.is_some_and(|caps| caps.keys().any(|key| strip_vendor_prefix(key) == wanted))
		};
		let in_first_match = sections
			.get("firstMatch")
			.and_then(Value::as_array)
			.is_some_and(|entries| entries.iter().any(sets));
		let in_always_match = sections.get("alwaysMatch").is_some_and(sets);
		if in_first_match || in_always_match {
			continue;
		}

		match sections.get_mut("firstMatch") {
			Some(Value::Array(entries)) if !entries.is_empty() => {
				if let Some(first) = entries[0].as_object_mut() {
					first.insert(name.clone(), value.clone());
				}
			}
			_ => {
				let mut entry = Capabilities::new();
				entry.insert(name.clone(), value.clone());
				sections.insert("firstMatch".to_string(), Value::Array(vec![Value::Object(entry)]));
			}
		}
	}
}

/// Copies legacy capabilities the W3C payload does not mention into `alwaysMatch`.
///
/// A legacy key counts as mentioned when a W3C key equals it, equals it with
/// the vendor prefix, or equals it after dropping its own namespace.
pub fn repair_w3c_capabilities(payload: &Value, legacy: &Capabilities) -> Value {
	let first_match = match payload.get("firstMatch") {
		Some(Value::Array(entries)) => entries.clone(),
		_ => Vec::new(),
	};
	let mut always_match = payload
		.get("alwaysMatch")
		.and_then(Value::as_object)
		.cloned()
		.unwrap_or_default();

	let mut pending: Vec<(&String, &Value)> = legacy.iter().collect();
	let mentioned = first_match
		.iter()
		.filter_map(Value::as_object)
		.flat_map(|entry| entry.keys())
		.chain(always_match.keys());
	for key in mentioned {
		let unscoped = key.split_once(':').map(|(_, rest)| rest);
		let prefixed = format!("{VENDOR_PREFIX}:{key}");
		pending.retain(|(name, _)| *name != key && Some(name.as_str()) != unscoped && **name != prefixed);
	}

	let additions: Vec<(String, Value)> = pending
		.into_iter()
		.map(|(name, value)| (name.clone(), value.clone()))
		.collect();
	always_match.extend(additions);

	let mut repaired = Capabilities::new();
	repaired.insert("firstMatch".to_string(), Value::Array(first_match));
	repaired.insert("alwaysMatch".to_string(), Value::Object(always_match));
	Value::Object(repaired)
}
