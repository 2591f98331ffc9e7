//! Command handlers.
//!
//! Every command prints one pretty JSON document to stdout.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;
use wdgate::{Negotiation, NegotiationRequest, W3cValidator, negotiate, server_status};

use crate::cli::{Cli, Commands, NegotiateArgs, ResolveArgs};
use crate::config::{EffectiveConfig, effective_config};

/// Runs the command selected on the command line.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = effective_config(&cli)?;
	debug!(
		target = "wdgate.cli",
		drivers = config.drivers.drivers.len(),
		session_override = config.gateway.session_override,
		"configuration loaded"
	);

	let output = match &cli.command {
		Commands::Negotiate(args) => run_negotiate(&config, args).await?,
		Commands::Resolve(args) => run_resolve(&config, args)?,
		Commands::Config => to_json(&config)?,
		Commands::Status => to_json(&server_status())?,
	};
	print_json(&output)
}

/// Negotiates the given capabilities and reports the driver that would serve them.
pub async fn run_negotiate(config: &EffectiveConfig, args: &NegotiateArgs) -> Result<Value> {
	let request = NegotiationRequest {
		legacy: args.legacy.as_ref(),
		w3c: args.w3c.as_ref(),
		constraints: &config.gateway.constraints,
		defaults: &config.gateway.default_capabilities,
	};
	let negotiation = negotiate(&W3cValidator, &request)
		.await
		.context("capability negotiation failed")?;

	let mut report = negotiation_report(&negotiation);
	let driver = match config.drivers.resolve(&negotiation.capabilities) {
		Ok(descriptor) => to_json(descriptor)?,
		Err(err) => json!({"error": err.to_string()}),
	};
	if let Some(fields) = report.as_object_mut() {
		fields.insert("driver".to_string(), driver);
	}
	Ok(report)
}

/// Resolves a canonical capability set to a driver descriptor.
pub fn run_resolve(config: &EffectiveConfig, args: &ResolveArgs) -> Result<Value> {
	let descriptor = config.drivers.resolve(&args.caps)?;
	to_json(descriptor)
}

fn negotiation_report(negotiation: &Negotiation) -> Value {
	json!({
		"protocol": negotiation.protocol,
		"capabilities": negotiation.capabilities,
		"legacy": negotiation.legacy,
		"w3c": negotiation.w3c,
	})
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
	serde_json::to_value(value).context("failed to serialize output")
}

fn print_json(value: &Value) -> Result<()> {
	let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
	println!("{rendered}");
	Ok(())
}
