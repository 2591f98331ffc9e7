//! Extraction of `settings[...]` capabilities.
//!
//! Drivers accept initial settings through capabilities named
//! `settings[<name>]`. They are pulled out before the session is created and
//! applied with [`Backend::update_settings`](wdgate_runtime::Backend::update_settings)
//! once it exists.

use std::sync::LazyLock;

use regex_lite::Regex;
use wdgate_protocol::Capabilities;

static SETTINGS_KEY_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\bsettings\[(\S+)\]$").expect("settings pattern is valid"));

/// Removes every `settings[name]` key from `caps` and returns `{name: value}`.
pub fn pull_settings(caps: &mut Capabilities) -> Capabilities {
	let mut settings = Capabilities::new();
	if caps.is_empty() {
		return settings;
	}

	let matched: Vec<(String, String)> = caps
		.keys()
		.filter_map(|key| {
			SETTINGS_KEY_RE
				.captures(key)
				.map(|captures| (key.clone(), captures[1].to_string()))
		})
		.collect();
	for (key, name) in matched {
		if let Some(value) = caps.remove(&key) {
			settings.insert(name, value);
		}
	}
	settings
}
