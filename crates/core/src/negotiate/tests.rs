use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::validation::{ValidationError, W3cValidator};

fn caps(value: Value) -> Capabilities {
	value.as_object().cloned().unwrap()
}

async fn run(legacy: Option<Value>, w3c: Option<Value>) -> Result<Negotiation> {
	run_with(&W3cValidator, legacy, w3c, &Capabilities::new(), &Constraints::new()).await
}

async fn run_with(
	validator: &dyn CapabilityValidator,
	legacy: Option<Value>,
	w3c: Option<Value>,
	defaults: &Capabilities,
	constraints: &Constraints,
) -> Result<Negotiation> {
	let request = NegotiationRequest {
		legacy: legacy.as_ref(),
		w3c: w3c.as_ref(),
		constraints,
		defaults,
	};
	negotiate(validator, &request).await
}

/// Rejects every payload.
struct RejectAll;

#[async_trait]
impl CapabilityValidator for RejectAll {
	async fn process(
		&self,
		_payload: &Value,
		_constraints: &Constraints,
		_strict: bool,
	) -> std::result::Result<Capabilities, ValidationError> {
		Err(ValidationError::new("nope"))
	}
}

#[tokio::test]
async fn nothing_supplied_is_an_error_answered_in_w3c() {
	let err = run(None, None).await.unwrap_err();
	assert!(matches!(err, Error::CapabilitiesMissing));
	assert_eq!(err.response_protocol(), Protocol::W3c);
	assert_eq!(err.to_string(), "Either legacy or W3C capabilities should be provided");
}

#[tokio::test]
async fn non_object_inputs_count_as_absent() {
	let err = run(Some(json!("caps")), Some(json!({"capabilities": {}}))).await.unwrap_err();
	assert!(matches!(err, Error::CapabilitiesMissing));
}

#[tokio::test]
async fn legacy_only() {
	let negotiation = run(Some(json!({"platformName": "Android", "deviceName": "Pixel"})), None)
		.await
		.unwrap();
	assert_eq!(negotiation.protocol, Protocol::Legacy);
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"platformName": "Android", "deviceName": "Pixel"})
	);
	assert_eq!(negotiation.legacy, Some(caps(json!({"platformName": "Android", "deviceName": "Pixel"}))));
	assert!(negotiation.w3c.is_none());
}

#[tokio::test]
async fn w3c_only_builds_prefixed_mirror() {
	let negotiation = run(
		None,
		Some(json!({"alwaysMatch": {"platformName": "iOS", "appium:deviceName": "iPhone"}})),
	)
	.await
	.unwrap();
	assert_eq!(negotiation.protocol, Protocol::W3c);
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"platformName": "iOS", "deviceName": "iPhone"})
	);
	assert!(negotiation.legacy.is_none());
	assert_eq!(
		negotiation.w3c.unwrap().to_value(),
		json!({"alwaysMatch": {"platformName": "iOS", "appium:deviceName": "iPhone"}, "firstMatch": [{}]})
	);
}

#[tokio::test]
async fn w3c_failure_without_legacy_propagates() {
	let err = run_with(
		&RejectAll,
		None,
		Some(json!({"alwaysMatch": {}})),
		&Capabilities::new(),
		&Constraints::new(),
	)
	.await
	.unwrap_err();
	assert!(matches!(err, Error::CapabilityValidation(ref message) if message == "nope"));
	assert_eq!(err.response_protocol(), Protocol::W3c);
}

#[tokio::test]
async fn both_valid_prefers_w3c_and_keeps_legacy_mirror() {
	let negotiation = run(
		Some(json!({"platformName": "Android", "deviceName": "Pixel"})),
		Some(json!({"alwaysMatch": {"platformName": "Android", "appium:deviceName": "Pixel"}})),
	)
	.await
	.unwrap();
	assert_eq!(negotiation.protocol, Protocol::W3c);
	assert_eq!(negotiation.legacy, Some(caps(json!({"platformName": "Android", "deviceName": "Pixel"}))));
	assert!(negotiation.w3c.is_some());
}

#[tokio::test]
async fn incomplete_w3c_is_repaired_from_legacy() {
	let negotiation = run(
		Some(json!({"platformName": "Android", "deviceName": "Pixel", "app": "/tmp/a.apk"})),
		Some(json!({"alwaysMatch": {"platformName": "Android"}})),
	)
	.await
	.unwrap();
	assert_eq!(negotiation.protocol, Protocol::W3c);
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"platformName": "Android", "deviceName": "Pixel", "app": "/tmp/a.apk"})
	);
	assert_eq!(
		negotiation.w3c.unwrap().always_match,
		caps(json!({"platformName": "Android", "appium:deviceName": "Pixel", "appium:app": "/tmp/a.apk"}))
	);
}

#[tokio::test]
async fn invalid_w3c_is_repaired_from_legacy() {
	let constraints: Constraints = serde_json::from_value(json!({"platformName": {"presence": true}})).unwrap();
	let negotiation = run_with(
		&W3cValidator,
		Some(json!({"platformName": "iOS"})),
		Some(json!({"alwaysMatch": {"appium:udid": "abc"}})),
		&Capabilities::new(),
		&constraints,
	)
	.await
	.unwrap();
	assert_eq!(negotiation.protocol, Protocol::W3c);
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"udid": "abc", "platformName": "iOS"})
	);
}

#[tokio::test]
async fn unrepairable_w3c_falls_back_to_legacy_silently() {
	let negotiation = run_with(
		&RejectAll,
		Some(json!({"platformName": "Android"})),
		Some(json!({"firstMatch": [{}]})),
		&Capabilities::new(),
		&Constraints::new(),
	)
	.await
	.unwrap();
	assert_eq!(negotiation.protocol, Protocol::Legacy);
	assert_eq!(Value::Object(negotiation.capabilities), json!({"platformName": "Android"}));
	assert_eq!(negotiation.legacy, Some(caps(json!({"platformName": "Android"}))));
	assert!(negotiation.w3c.is_none());
}

#[tokio::test]
async fn defaults_sit_underneath_legacy() {
	let defaults = caps(json!({"appium:newCommandTimeout": 60, "platformName": "iOS"}));
	let negotiation = run_with(
		&W3cValidator,
		Some(json!({"platformName": "Android"})),
		None,
		&defaults,
		&Constraints::new(),
	)
	.await
	.unwrap();
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"newCommandTimeout": 60, "platformName": "Android"})
	);
}

#[tokio::test]
async fn defaults_fill_first_match_unless_already_set() {
	let defaults = caps(json!({"appium:newCommandTimeout": 60, "deviceName": "Default"}));
	let negotiation = run_with(
		&W3cValidator,
		None,
		Some(json!({"alwaysMatch": {"platformName": "iOS", "appium:deviceName": "iPhone"}})),
		&defaults,
		&Constraints::new(),
	)
	.await
	.unwrap();
	assert_eq!(
		Value::Object(negotiation.capabilities),
		json!({"platformName": "iOS", "deviceName": "iPhone", "newCommandTimeout": 60})
	);
}

#[tokio::test]
async fn caller_inputs_are_not_mutated() {
	let legacy = json!({"platformName": "Android"});
	let w3c = json!({"alwaysMatch": {"platformName": "Android"}});
	let defaults = caps(json!({"appium:app": "/tmp/a.apk"}));
	let request = NegotiationRequest {
		legacy: Some(&legacy),
		w3c: Some(&w3c),
		constraints: &Constraints::new(),
		defaults: &defaults,
	};
	negotiate(&W3cValidator, &request).await.unwrap();

	assert_eq!(legacy, json!({"platformName": "Android"}));
	assert_eq!(w3c, json!({"alwaysMatch": {"platformName": "Android"}}));
}

#[test]
fn apply_defaults_creates_first_match_when_missing() {
	let mut payload = json!({"alwaysMatch": {}});
	apply_w3c_defaults(&mut payload, &caps(json!({"appium:app": "a"})));
	assert_eq!(payload, json!({"alwaysMatch": {}, "firstMatch": [{"appium:app": "a"}]}));

	let mut payload = json!({"firstMatch": [{"platformName": "iOS"}, {}]});
	apply_w3c_defaults(&mut payload, &caps(json!({"udid": "x"})));
	assert_eq!(payload, json!({"firstMatch": [{"platformName": "iOS", "udid": "x"}, {}]}));
}

#[test]
fn apply_defaults_skips_keys_set_under_any_namespace() {
	let mut payload = json!({"firstMatch": [{}, {"appium:udid": "y"}]});
	apply_w3c_defaults(&mut payload, &caps(json!({"udid": "x"})));
	assert_eq!(payload, json!({"firstMatch": [{}, {"appium:udid": "y"}]}));
}

#[test]
fn repair_inserts_only_unmentioned_legacy_keys() {
	let legacy = caps(json!({
		"platformName": "iOS",
		"deviceName": "iPhone",
		"app": "/tmp/App.app",
		"moz:debug": true,
		"udid": "abc"
	}));
	let payload = json!({
		"alwaysMatch": {"appium:deviceName": "iPhone"},
		"firstMatch": [{"platformName": "iOS"}, {"debug": false}, "junk"]
	});
	let repaired = repair_w3c_capabilities(&payload, &legacy);

	assert_eq!(
		repaired,
		json!({
			"firstMatch": [{"platformName": "iOS"}, {"debug": false}, "junk"],
			"alwaysMatch": {
				"appium:deviceName": "iPhone",
				"app": "/tmp/App.app",
				"moz:debug": true,
				"udid": "abc"
			}
		})
	);
}

#[test]
fn repair_handles_prefixed_legacy_keys() {
	let legacy = caps(json!({"appium:app": "a", "app2": "b"}));
	let repaired = repair_w3c_capabilities(&json!({"alwaysMatch": {"app": "a"}}), &legacy);
	assert_eq!(repaired, json!({"firstMatch": [], "alwaysMatch": {"app": "a", "app2": "b"}}));
}
