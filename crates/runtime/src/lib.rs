//! wdgate runtime - backend driver contracts and selection
//!
//! This crate holds everything the gateway needs to know about inner drivers
//! without depending on any concrete one:
//!
//! - **Backend contract**: [`Backend`] and [`BackendFactory`], the async
//!   interface every automation engine implements
//! - **Shutdown signalling**: a single-fire channel a backend uses to report
//!   that it died outside of an explicit delete
//! - **Driver registry**: a configured [`DriverTable`] that maps a canonical
//!   capability set to one driver descriptor, paired with factories in
//!   [`DriverRegistry`]
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   wdgate     │  Negotiation, session table, gateway
//! └──────┬───────┘
//!        │ resolve(caps) / factory.create()
//! ┌──────▼───────┐
//! │wdgate-runtime│  This crate
//! │  ┌────────┐  │
//! │  │Registry│  │  platform/automationName matching
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │Backend │  │  create/delete session, shutdown signal
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod backend;
pub mod error;
pub mod registry;
pub mod shutdown;

pub use backend::{Backend, BackendError, BackendFactory};
pub use error::{Error, Result};
pub use registry::{DriverDescriptor, DriverRegistry, DriverTable, PlatformRule, PlatformVersion, ResolvedDriver};
pub use shutdown::{ShutdownEvent, ShutdownListener, ShutdownNotifier, shutdown_channel};
