//! wdgate - WebDriver session gateway
//!
//! Accepts session requests in either capability format, negotiates the
//! protocol, picks an inner driver, and owns every active session until it is
//! deleted, evicted, or its backend dies.
//!
//! - [`negotiate`]: legacy/W3C reconciliation into one canonical capability set
//! - [`validation`]: W3C capability processing behind [`CapabilityValidator`]
//! - [`settings`]: `settings[...]` capability extraction
//! - [`table`]: insertion-ordered active session table
//! - [`gateway`]: [`SessionGateway`], the entry point tying them together
//!
//! # Example
//!
//! ```ignore
//! let gateway = SessionGateway::new(config, registry);
//! let created = gateway
//! 	.create_session(Some(json!({"platformName": "Android"})), None)
//! 	.await?;
//! gateway.delete_session(&created.id).await?;
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod negotiate;
pub mod settings;
pub mod table;
pub mod validation;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gateway::{CreatedSession, DriverSummary, SessionGateway, server_status};
pub use negotiate::{Negotiation, NegotiationRequest, negotiate, repair_w3c_capabilities};
pub use settings::pull_settings;
pub use table::{ActiveSession, SessionTable, ShutdownSubscription};
pub use validation::{CapabilityValidator, Constraint, Constraints, ValidationError, W3cValidator};
pub use wdgate_protocol::{Capabilities, Protocol, ServerStatus, SessionSummary, W3cCapabilities};
pub use wdgate_runtime::{
	Backend, BackendError, BackendFactory, DriverDescriptor, DriverRegistry, DriverTable, PlatformRule,
	PlatformVersion, ShutdownListener, ShutdownNotifier, shutdown_channel,
};
