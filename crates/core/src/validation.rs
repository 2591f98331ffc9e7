//! W3C capability processing.
//!
//! [`CapabilityValidator`] is the seam the reconciler calls; [`W3cValidator`]
//! implements the standard `alwaysMatch`/`firstMatch` algorithm: strip vendor
//! prefixes, validate against [`Constraints`], then merge each `firstMatch`
//! alternative with `alwaysMatch` and keep the first one that succeeds.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use wdgate_protocol::{Capabilities, VENDOR_PREFIX, is_standard_capability};

/// Capability processing failure, reported to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
	pub fn new(message: impl Into<String>) -> Self {
		Self(message.into())
	}
}

/// Rules one capability must satisfy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraint {
	pub presence: bool,
	pub is_string: bool,
	pub is_number: bool,
	pub is_boolean: bool,
	pub is_object: bool,
	pub is_array: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inclusion: Option<Vec<Value>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub inclusion_case_insensitive: Option<Vec<String>>,
}

impl Constraint {
	fn check(&self, name: &str, value: Option<&Value>, skip_presence: bool, errors: &mut Vec<String>) {
		let value = value.filter(|v| !v.is_null());
		let Some(value) = value else {
			if self.presence && !skip_presence {
				errors.push(format!("'{name}' can't be blank"));
			}
			return;
		};

		let kinds = [
			(self.is_string, "string", value.is_string()),
			(self.is_number, "number", value.is_number()),
			(self.is_boolean, "boolean", value.is_boolean()),
			(self.is_object, "object", value.is_object()),
			(self.is_array, "array", value.is_array()),
		];
		for (required, kind, matches) in kinds {
			if required && !matches {
				errors.push(format!("'{name}' must be of type {kind}"));
			}
		}

		if let Some(allowed) = self.inclusion.as_ref().filter(|allowed| !allowed.contains(value)) {
			let list: Vec<String> = allowed.iter().map(render).collect();
			errors.push(format!("'{name}' {} not part of {}", render(value), list.join(", ")));
		}

		if let Some(allowed) = &self.inclusion_case_insensitive {
			let found = value
				.as_str()
				.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v)));
			if !found {
				errors.push(format!("'{name}' {} not part of {}", render(value), allowed.join(", ")));
			}
		}
	}
}

/// Constraints keyed by unprefixed capability name, checked in insertion order.
pub type Constraints = IndexMap<String, Constraint>;

fn render(value: &Value) -> String {
	match value {
		Value::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn is_truthy(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(_) | Value::Object(_) => true,
	}
}

/// Resolves a W3C capabilities payload into one flat capability set.
#[async_trait]
pub trait CapabilityValidator: Send + Sync {
	/// Processes `payload` (an object with `alwaysMatch`/`firstMatch`).
	///
	/// With `strict` set, every entry is checked against `constraints`.
	async fn process(
		&self,
		payload: &Value,
		constraints: &Constraints,
		strict: bool,
	) -> Result<Capabilities, ValidationError>;
}

/// Standard W3C capability processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct W3cValidator;

#[async_trait]
impl CapabilityValidator for W3cValidator {
	async fn process(
		&self,
		payload: &Value,
		constraints: &Constraints,
		strict: bool,
	) -> Result<Capabilities, ValidationError> {
		process_capabilities(payload, constraints, strict)
	}
}

/// Synchronous core of [`W3cValidator`].
pub fn process_capabilities(
	payload: &Value,
	constraints: &Constraints,
	strict: bool,
) -> Result<Capabilities, ValidationError> {
	let Value::Object(caps) = payload else {
		return Err(ValidationError::new(
			"The capabilities argument was not valid: \"capabilities\" must be a JSON object",
		));
	};

	let always_match = match caps.get("alwaysMatch") {
		None | Some(Value::Null) => Capabilities::new(),
		Some(Value::Object(map)) => map.clone(),
		Some(_) => {
			return Err(ValidationError::new(
				"The capabilities.alwaysMatch argument was not valid: \"capabilities.alwaysMatch\" must be a JSON object",
			));
		}
	};
	let mut first_match = match caps.get("firstMatch") {
		None | Some(Value::Null) => vec![Capabilities::new()],
		Some(Value::Array(entries)) => entries
			.iter()
			.map(|entry| entry.as_object().cloned())
			.collect::<Option<Vec<_>>>()
			.ok_or_else(|| {
				ValidationError::new(
					"The capabilities.firstMatch argument was not valid: every entry must be a JSON object",
				)
			})?,
		Some(_) => {
			return Err(ValidationError::new(
				"The capabilities.firstMatch argument was not valid: \"capabilities.firstMatch\" must be a JSON array",
			));
		}
	};
	if first_match.is_empty() {
		first_match.push(Capabilities::new());
	}

	let unprefixed: Vec<&str> = always_match
		.keys()
		.chain(first_match.iter().flat_map(|entry| entry.keys()))
		.map(String::as_str)
		.filter(|name| !is_standard_capability(name) && !name.contains(':'))
		.collect();
	if !unprefixed.is_empty() {
		warn!(
			target = "wdgate.validation",
			capabilities = ?unprefixed,
			"non-standard capabilities should carry the '{VENDOR_PREFIX}:' prefix"
		);
	}

	let always_match = strip_prefixes(always_match);
	let first_match: Vec<Capabilities> = first_match.into_iter().map(strip_prefixes).collect();

	if strict {
		validate(&always_match, constraints, true)?;
	}
	let remaining: Constraints = constraints
		.iter()
		.filter(|(name, _)| !always_match.get(name.as_str()).is_some_and(is_truthy))
		.map(|(name, constraint)| (name.clone(), constraint.clone()))
		.collect();

	let mut errors = Vec::new();
	for entry in &first_match {
		let outcome = if strict {
			validate(entry, &remaining, false)
		} else {
			Ok(())
		};
		match outcome.and_then(|()| merge(&always_match, entry)) {
			Ok(merged) => return Ok(merged),
			Err(err) => errors.push(err.0),
		}
	}

	if first_match.len() > 1 {
		Err(ValidationError::new(format!(
			"Could not find matching capabilities from {payload}: {}",
			errors.join("; ")
		)))
	} else {
		Err(ValidationError::new(errors.into_iter().next().unwrap_or_default()))
	}
}

/// Removes `appium:` from every key.
///
/// A prefixed standard name only fills in when the unprefixed name is absent;
/// for any other name the prefixed value replaces an unprefixed duplicate.
fn strip_prefixes(caps: Capabilities) -> Capabilities {
	let prefix = format!("{VENDOR_PREFIX}:");
	let mut out = Capabilities::new();
	let mut prefixed = Vec::new();
	for (name, value) in caps {
		match name.strip_prefix(&prefix) {
			Some(stripped) => prefixed.push((stripped.to_string(), value)),
			None => {
				out.insert(name, value);
			}
		}
	}
	for (name, value) in prefixed {
		if is_standard_capability(&name) && out.get(&name).is_some_and(|v| !v.is_null()) {
			warn!(
				target = "wdgate.validation",
				capability = %name,
				"ignoring '{prefix}{name}' in favour of the unprefixed capability"
			);
			continue;
		}
		out.insert(name, value);
	}
	out
}

fn validate(caps: &Capabilities, constraints: &Constraints, skip_presence: bool) -> Result<(), ValidationError> {
	let mut errors = Vec::new();
	for (name, constraint) in constraints {
		constraint.check(name, caps.get(name), skip_presence, &mut errors);
	}
	if errors.is_empty() {
		Ok(())
	} else {
		Err(ValidationError::new(errors.join("; ")))
	}
}

fn merge(primary: &Capabilities, secondary: &Capabilities) -> Result<Capabilities, ValidationError> {
	let mut merged = primary.clone();
	for (name, value) in secondary {
		if primary.contains_key(name) {
			return Err(ValidationError::new(format!(
				"property '{name}' should not exist on both primary ({}) and secondary ({}) object",
				Value::Object(primary.clone()),
				Value::Object(secondary.clone())
			)));
		}
		merged.insert(name.clone(), value.clone());
	}
	Ok(merged)
}
