//! Driver table used when the config file does not supply one.

use wdgate::{DriverDescriptor, DriverTable, PlatformRule, PlatformVersion};

/// iOS versions below this are served by the legacy Instruments backend.
pub const IOS_MODERN_THRESHOLD: &str = "10";

fn driver(name: &str, automation_name: &str, platforms: &[&str]) -> DriverDescriptor {
	DriverDescriptor {
		name: name.to_string(),
		automation_name: automation_name.to_string(),
		platforms: platforms.iter().map(|p| p.to_string()).collect(),
		version: "builtin".to_string(),
	}
}

fn sole(driver: &str) -> PlatformRule {
	PlatformRule::Sole {
		driver: driver.to_string(),
	}
}

/// The stock mobile and desktop drivers.
pub fn builtin_driver_table() -> DriverTable {
	let ios = match PlatformVersion::parse(IOS_MODERN_THRESHOLD) {
		Some(threshold) => PlatformRule::VersionSplit {
			threshold,
			legacy: "instruments".to_string(),
			modern: "xcuitest".to_string(),
		},
		None => sole("xcuitest"),
	};

	DriverTable::default()
		.with_driver(driver("xcuitest", "XCUITest", &["iOS", "tvOS"]))
		.with_driver(driver("instruments", "Instruments", &["iOS"]))
		.with_driver(driver("uiautomator2", "UiAutomator2", &["Android"]))
		.with_driver(driver("espresso", "Espresso", &["Android"]))
		.with_driver(driver("youiengine", "YouiEngine", &["iOS", "Android", "Mac", "Windows"]))
		.with_driver(driver("windows", "Windows", &["Windows"]))
		.with_driver(driver("mac", "Mac", &["Mac"]))
		.with_driver(driver("fake", "Fake", &["Fake"]))
		.with_platform("iOS", ios)
		.with_platform("tvOS", sole("xcuitest"))
		.with_platform("Android", sole("uiautomator2"))
		.with_platform("Windows", sole("windows"))
		.with_platform("Mac", sole("mac"))
		.with_platform("Fake", sole("fake"))
}
