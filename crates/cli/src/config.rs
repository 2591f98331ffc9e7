//! Config file loading and JSON argument parsing.
//!
//! The config file is JSON:
//!
//! ```json
//! {
//!   "gateway": { "sessionOverride": false, "defaultCapabilities": {}, "constraints": {} },
//!   "drivers": { "drivers": [...], "platforms": {...} }
//! }
//! ```
//!
//! Both sections are optional. Without `drivers` the built-in table is used.
//! `--default-capabilities` wins over the file value.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wdgate::{Capabilities, DriverTable, GatewayConfig};

use crate::cli::Cli;
use crate::drivers::builtin_driver_table;

/// On-disk configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFile {
	pub gateway: GatewayConfig,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub drivers: Option<DriverTable>,
}

/// Configuration after merging file contents with flags.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveConfig {
	pub gateway: GatewayConfig,
	pub drivers: DriverTable,
}

/// Reads and parses a config file.
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
	let text = fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))?;
	serde_json::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

/// Builds the effective configuration for a parsed command line.
pub fn effective_config(cli: &Cli) -> Result<EffectiveConfig> {
	let file = match &cli.config {
		Some(path) => load_config_file(path)?,
		None => ConfigFile::default(),
	};

	let mut gateway = file.gateway;
	if let Some(defaults) = &cli.default_capabilities {
		gateway.default_capabilities = defaults.clone();
	}

	let drivers = file.drivers.unwrap_or_else(builtin_driver_table);
	drivers.validate().context("driver table in config file is inconsistent")?;

	Ok(EffectiveConfig { gateway, drivers })
}

/// Parses an argument given either as inline JSON or as a path to a JSON file.
pub fn parse_json_arg(raw: &str) -> Result<Value> {
	match serde_json::from_str::<Value>(raw) {
		Ok(value) => Ok(value),
		Err(parse_err) => {
			let path = Path::new(raw);
			if !path.is_file() {
				bail!("'{raw}' is neither valid JSON nor an existing file ({parse_err})");
			}
			let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
			serde_json::from_str(&text).with_context(|| format!("{} does not contain valid JSON", path.display()))
		}
	}
}

/// Like [`parse_json_arg`], but the value must be a JSON object.
pub fn parse_capabilities_arg(raw: &str) -> Result<Capabilities> {
	match parse_json_arg(raw)? {
		Value::Object(caps) => Ok(caps),
		other => bail!("capabilities must be a JSON object, got {other}"),
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use clap::Parser;
	use serde_json::json;

	use super::*;

	fn json_file(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn capabilities_from_inline_json() {
		let caps = parse_capabilities_arg(r#"{"a": "b"}"#).unwrap();
		assert_eq!(Value::Object(caps), json!({"a": "b"}));
	}

	#[test]
	fn capabilities_from_file() {
		let file = json_file(r#"{"a": "b"}"#);
		let caps = parse_capabilities_arg(file.path().to_str().unwrap()).unwrap();
		assert_eq!(Value::Object(caps), json!({"a": "b"}));
	}

	#[test]
	fn capabilities_reject_non_objects_and_missing_files() {
		for raw in ["42", "false", "null", "[1]", "does/not/exist.json"] {
			assert!(parse_capabilities_arg(raw).is_err(), "{raw} should be rejected");
		}
	}

	#[test]
	fn capabilities_reject_file_with_bad_json() {
		let file = json_file("{not json");
		let err = parse_capabilities_arg(file.path().to_str().unwrap()).unwrap_err();
		assert!(format!("{err:#}").contains("does not contain valid JSON"));
	}

	#[test]
	fn flag_overrides_file_defaults() {
		let file = json_file(
			r#"{"gateway": {"sessionOverride": true, "defaultCapabilities": {"a": 1}}}"#,
		);
		let path = file.path().to_str().unwrap();
		let cli = Cli::try_parse_from([
			"wdgate",
			"--config",
			path,
			"--default-capabilities",
			r#"{"b": 2}"#,
			"config",
		])
		.unwrap();

		let effective = effective_config(&cli).unwrap();
		assert!(effective.gateway.session_override);
		assert_eq!(Value::Object(effective.gateway.default_capabilities), json!({"b": 2}));
		assert_eq!(effective.drivers, builtin_driver_table());
	}

	#[test]
	fn file_driver_table_replaces_builtin() {
		let file = json_file(
			r#"{"drivers": {
				"drivers": [{"name": "tizen", "automationName": "Tizen", "platforms": ["Tizen"], "version": "1.0"}],
				"platforms": {"Tizen": {"kind": "sole", "driver": "tizen"}}
			}}"#,
		);
		let cli = Cli::try_parse_from(["wdgate", "--config", file.path().to_str().unwrap(), "config"]).unwrap();
		let effective = effective_config(&cli).unwrap();
		assert_eq!(effective.drivers.drivers.len(), 1);
		assert_eq!(effective.gateway, GatewayConfig::default());
	}

	#[test]
	fn inconsistent_driver_table_is_rejected() {
		let file = json_file(r#"{"drivers": {"platforms": {"Tizen": {"kind": "sole", "driver": "tizen"}}}}"#);
		let cli = Cli::try_parse_from(["wdgate", "--config", file.path().to_str().unwrap(), "config"]).unwrap();
		assert!(effective_config(&cli).is_err());
	}

	#[test]
	fn missing_config_file_is_an_error() {
		let cli = Cli::try_parse_from(["wdgate", "--config", "/nonexistent/wdgate.json", "config"]).unwrap();
		let err = effective_config(&cli).unwrap_err();
		assert!(format!("{err:#}").contains("failed to read config file"));
	}
}
