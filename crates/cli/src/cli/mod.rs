
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use wdgate::Capabilities;

use crate::config::{parse_capabilities_arg, parse_json_arg};

fn json_value(raw: &str) -> Result<Value, String> {
	parse_json_arg(raw).map_err(|err| format!("{err:#}"))
}

fn capabilities_value(raw: &str) -> Result<Capabilities, String> {
	parse_capabilities_arg(raw).map_err(|err| format!("{err:#}"))
}

/// Root CLI for wdgate.
#[derive(Parser, Debug)]
#[command(name = "wdgate")]
#[command(about = "WebDriver session gateway - capability negotiation and driver dispatch")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Gateway config file (JSON)
	#[arg(short, long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Capabilities applied underneath every request: a JSON object or a path to one
	#[arg(long, global = true, value_name = "JSON|FILE", value_parser = capabilities_value)]
	pub default_capabilities: Option<Capabilities>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Reconcile legacy and W3C capabilities and show the outcome.
	Negotiate(NegotiateArgs),
	/// Show which driver would serve a capability set.
	Resolve(ResolveArgs),
	/// Print the effective configuration.
	Config,
	/// Print build information.
	Status,
}

#[derive(Args, Debug)]
pub struct NegotiateArgs {
	/// Legacy desired capabilities (JSON or file)
	#[arg(long, value_name = "JSON|FILE", value_parser = json_value)]
	pub legacy: Option<Value>,

	/// W3C capabilities with alwaysMatch/firstMatch (JSON or file)
	#[arg(long, value_name = "JSON|FILE", value_parser = json_value)]
	pub w3c: Option<Value>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
	/// Canonical capabilities (JSON object or file)
	#[arg(value_name = "JSON|FILE", value_parser = capabilities_value)]
	pub caps: Capabilities,
}
