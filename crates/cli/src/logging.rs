//! Stderr log output for the binary.
//!
//! Library crates only emit `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` overrides the `-v` mapping entirely.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter directives for a `-v` count.
///
/// Gateway targets are all `wdgate.*`, so a single `wdgate=` directive
/// covers negotiation, registry, and session lifetime events.
pub fn default_directives(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "error",
		1 => "warn,wdgate=info",
		_ => "debug",
	}
}

pub fn init_logging(verbosity: u8) {
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE))
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}
