//! Dotted platform version parsing for version-split driver rules.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric dotted version such as `9.4` or `12.14.1`.
///
/// Missing trailing components compare as zero, so `10` equals `10.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformVersion {
	parts: Vec<u64>,
}

impl PlatformVersion {
	/// Parses a version string; returns `None` for empty or non-numeric input.
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();
		if raw.is_empty() {
			return None;
		}
		let parts = raw
			.split('.')
			.map(|part| part.parse::<u64>().ok())
			.collect::<Option<Vec<_>>>()?;
		Some(Self { parts })
	}

	/// Reads a `platformVersion` capability given as a string or a number.
	pub fn from_capability(value: &Value) -> Option<Self> {
		match value {
			Value::String(raw) => Self::parse(raw),
			Value::Number(number) => Self::parse(&number.to_string()),
			_ => None,
		}
	}

	fn component(&self, index: usize) -> u64 {
		self.parts.get(index).copied().unwrap_or(0)
	}
}

impl Ord for PlatformVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		let len = self.parts.len().max(other.parts.len());
		(0..len)
			.map(|i| self.component(i).cmp(&other.component(i)))
			.find(|ord| *ord != Ordering::Equal)
			.unwrap_or(Ordering::Equal)
	}
}

impl PartialOrd for PlatformVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for PlatformVersion {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for PlatformVersion {}

impl fmt::Display for PlatformVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let rendered: Vec<String> = self.parts.iter().map(u64::to_string).collect();
		f.write_str(&rendered.join("."))
	}
}

impl FromStr for PlatformVersion {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s).ok_or_else(|| format!("'{s}' is not a dotted numeric version"))
	}
}

impl TryFrom<String> for PlatformVersion {
	type Error = String;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<PlatformVersion> for String {
	fn from(version: PlatformVersion) -> Self {
		version.to_string()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn v(raw: &str) -> PlatformVersion {
		PlatformVersion::parse(raw).unwrap()
	}

	#[test]
	fn parses_dotted_numbers() {
		assert_eq!(v("9.4").to_string(), "9.4");
		assert_eq!(v(" 12.14.1 ").to_string(), "12.14.1");
	}

	#[test]
	fn rejects_garbage() {
		assert!(PlatformVersion::parse("").is_none());
		assert!(PlatformVersion::parse("foo").is_none());
		assert!(PlatformVersion::parse("10.x").is_none());
		assert!(PlatformVersion::parse("10..1").is_none());
	}

	#[test]
	fn trailing_zeros_compare_equal() {
		assert_eq!(v("10"), v("10.0"));
		assert!(v("9.4") < v("10"));
		assert!(v("10.1") > v("10"));
		assert!(v("9.10") > v("9.9"));
	}

	#[test]
	fn reads_numeric_capability_values() {
		assert_eq!(PlatformVersion::from_capability(&json!(9.4)), Some(v("9.4")));
		assert_eq!(PlatformVersion::from_capability(&json!(10)), Some(v("10")));
		assert_eq!(PlatformVersion::from_capability(&json!(true)), None);
	}
}
