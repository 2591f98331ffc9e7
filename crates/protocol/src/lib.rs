//! Wire types shared by the wdgate crates.
//!
//! Capabilities travel in two encodings: the legacy flat dictionary and the
//! W3C `alwaysMatch`/`firstMatch` object. This crate holds the types both
//! sides agree on plus the vendor namespace helpers used while translating
//! between them.

pub mod namespace;
pub mod types;

pub use namespace::{
	STANDARD_CAPABILITIES, VENDOR_PREFIX, insert_vendor_prefixes, is_standard_capability, strip_vendor_prefix,
	strip_vendor_prefixes, strip_vendor_prefixes_map,
};
pub use types::{BuildInfo, Capabilities, Protocol, ServerStatus, SessionSummary, W3cCapabilities};
