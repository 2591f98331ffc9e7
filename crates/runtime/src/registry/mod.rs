//! Driver selection from canonical capabilities.
//!
//! Selection follows a fixed priority:
//! 1. an explicit `automationName` matching a descriptor for the platform
//! 2. a version-split platform rule keyed on `platformVersion`
//! 3. the platform's sole driver
//!
//! Every name comparison ignores ASCII case.

mod version;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
pub use version::PlatformVersion;
use wdgate_protocol::Capabilities;

use crate::backend::BackendFactory;
use crate::error::{Error, Result};

/// Automation names that mean "let the platform decide".
pub const GENERIC_AUTOMATION_NAMES: [&str; 1] = ["Appium"];

/// Static description of one backend driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverDescriptor {
	/// Unique driver name, also the key for its factory.
	pub name: String,
	/// Value of `automationName` that selects this driver explicitly.
	pub automation_name: String,
	/// Platforms this driver can serve.
	pub platforms: Vec<String>,
	/// Advertised driver version.
	pub version: String,
}

impl DriverDescriptor {
	fn supports(&self, platform: &str) -> bool {
		self.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
	}
}

/// Fallback rule applied when no explicit automation name matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlatformRule {
	/// The platform has exactly one backend.
	Sole { driver: String },
	/// The backend depends on the platform OS version.
	///
	/// Versions below `threshold` use `legacy`; everything else, including an
	/// absent or unparsable version, uses `modern`.
	VersionSplit {
		threshold: PlatformVersion,
		legacy: String,
		modern: String,
	},
}

impl PlatformRule {
	fn drivers(&self) -> Vec<&str> {
		match self {
			PlatformRule::Sole { driver } => vec![driver.as_str()],
			PlatformRule::VersionSplit { legacy, modern, .. } => vec![legacy.as_str(), modern.as_str()],
		}
	}
}

fn default_generic_automation_names() -> Vec<String> {
	GENERIC_AUTOMATION_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Read-only descriptor table consulted for every session request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverTable {
	#[serde(default)]
	pub drivers: Vec<DriverDescriptor>,
	/// Fallback rules keyed by platform name.
	#[serde(default)]
	pub platforms: BTreeMap<String, PlatformRule>,
	#[serde(default = "default_generic_automation_names")]
	pub generic_automation_names: Vec<String>,
}

impl Default for DriverTable {
	fn default() -> Self {
		Self {
			drivers: Vec::new(),
			platforms: BTreeMap::new(),
			generic_automation_names: default_generic_automation_names(),
		}
	}
}

impl DriverTable {
	/// Adds a driver descriptor.
	pub fn with_driver(mut self, descriptor: DriverDescriptor) -> Self {
		self.drivers.push(descriptor);
		self
	}

	/// Sets the fallback rule for a platform.
	pub fn with_platform(mut self, platform: impl Into<String>, rule: PlatformRule) -> Self {
		self.platforms.insert(platform.into(), rule);
		self
	}

	/// Checks that names are unique and every rule points at a known driver.
	pub fn validate(&self) -> Result<()> {
		for (i, descriptor) in self.drivers.iter().enumerate() {
			if self.drivers[..i].iter().any(|d| d.name == descriptor.name) {
				return Err(Error::InvalidRegistry(format!("duplicate driver name '{}'", descriptor.name)));
			}
		}
		for (platform, rule) in &self.platforms {
			for driver in rule.drivers() {
				if self.driver(driver).is_none() {
					return Err(Error::InvalidRegistry(format!(
						"platform '{platform}' references unknown driver '{driver}'"
					)));
				}
			}
		}
		Ok(())
	}

	/// Looks up a descriptor by its exact name.
	pub fn driver(&self, name: &str) -> Option<&DriverDescriptor> {
		self.drivers.iter().find(|d| d.name == name)
	}

	fn rule_for(&self, platform: &str) -> Option<&PlatformRule> {
		self.platforms
			.iter()
			.find(|(name, _)| name.eq_ignore_ascii_case(platform))
			.map(|(_, rule)| rule)
	}

	fn is_generic(&self, automation_name: &str) -> bool {
		self.generic_automation_names
			.iter()
			.any(|name| name.eq_ignore_ascii_case(automation_name))
	}

	fn rule_driver(&self, name: &str) -> Result<&DriverDescriptor> {
		self.driver(name)
			.ok_or_else(|| Error::InvalidRegistry(format!("platform rule references unknown driver '{name}'")))
	}

	/// Picks the descriptor that should serve `caps`.
	pub fn resolve(&self, caps: &Capabilities) -> Result<&DriverDescriptor> {
		let Some(platform) = caps.get("platformName").and_then(Value::as_str) else {
			return Err(Error::MissingPlatform);
		};
		let automation_name = caps.get("automationName").and_then(Value::as_str);

		if let Some(requested) = automation_name.filter(|name| !self.is_generic(name)) {
			if let Some(descriptor) = self
				.drivers
				.iter()
				.find(|d| d.automation_name.eq_ignore_ascii_case(requested) && d.supports(platform))
			{
				return Ok(descriptor);
			}
			debug!(
				target = "wdgate.registry",
				automation_name = requested,
				platform,
				"no driver for automationName; trying platform rules"
			);
		}

		match self.rule_for(platform) {
			Some(PlatformRule::VersionSplit { threshold, legacy, modern }) => {
				let version = caps.get("platformVersion").and_then(PlatformVersion::from_capability);
				let chosen = match &version {
					Some(version) if version < threshold => legacy,
					_ => modern,
				};
				debug!(
					target = "wdgate.registry",
					platform,
					version = version.as_ref().map(|v| v.to_string()),
					%threshold,
					driver = %chosen,
					"selected driver by platform version"
				);
				self.rule_driver(chosen)
			}
			Some(PlatformRule::Sole { driver }) => self.rule_driver(driver),
			None => Err(Error::UnknownPlatform {
				platform: platform.to_string(),
				automation_name: automation_name.map(str::to_string),
			}),
		}
	}
}

/// A driver chosen for a session, ready to be instantiated.
#[derive(Clone)]
pub struct ResolvedDriver {
	pub descriptor: DriverDescriptor,
	pub factory: Arc<dyn BackendFactory>,
}

impl std::fmt::Debug for ResolvedDriver {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ResolvedDriver")
			.field("descriptor", &self.descriptor)
			.finish_non_exhaustive()
	}
}

/// Driver table paired with one factory per descriptor.
pub struct DriverRegistry {
	table: DriverTable,
	factories: HashMap<String, Arc<dyn BackendFactory>>,
}

impl DriverRegistry {
	/// Builds a registry, failing if the table is inconsistent or a driver has no factory.
	pub fn new<I>(table: DriverTable, factories: I) -> Result<Self>
	where
		I: IntoIterator<Item = (String, Arc<dyn BackendFactory>)>,
	{
		table.validate()?;
		let factories: HashMap<_, _> = factories.into_iter().collect();
		if let Some(missing) = table.drivers.iter().find(|d| !factories.contains_key(&d.name)) {
			return Err(Error::InvalidRegistry(format!("no factory registered for driver '{}'", missing.name)));
		}
		Ok(Self { table, factories })
	}

	/// Returns the descriptor table.
	pub fn table(&self) -> &DriverTable {
		&self.table
	}

	/// Resolves the driver and factory for `caps`.
	pub fn resolve(&self, caps: &Capabilities) -> Result<ResolvedDriver> {
		let descriptor = self.table.resolve(caps)?;
		let factory = self
			.factories
			.get(&descriptor.name)
			.cloned()
			.ok_or_else(|| Error::InvalidRegistry(format!("no factory registered for driver '{}'", descriptor.name)))?;
		Ok(ResolvedDriver {
			descriptor: descriptor.clone(),
			factory,
		})
	}
}

impl std::fmt::Debug for DriverRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DriverRegistry")
			.field("table", &self.table)
			.field("factories", &self.factories.keys().collect::<Vec<_>>())
			.finish()
	}
}
