//! Error types for session negotiation and lifetime.

use thiserror::Error;
use wdgate_protocol::Protocol;
use wdgate_runtime::BackendError;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the gateway to its callers.
#[derive(Debug, Error)]
pub enum Error {
	/// Neither a legacy object nor a W3C payload was supplied.
	#[error("Either legacy or W3C capabilities should be provided")]
	CapabilitiesMissing,

	/// The W3C payload failed processing and no legacy fallback existed.
	#[error("{0}")]
	CapabilityValidation(String),

	/// No driver could be chosen for the canonical capabilities.
	#[error(transparent)]
	Driver(#[from] wdgate_runtime::Error),

	/// The backend refused to start the session.
	#[error("{0}")]
	BackendCreate(BackendError),

	/// The backend rejected the initial settings; the new session was discarded.
	#[error("{0}")]
	SessionSettings(BackendError),

	/// The backend failed while ending a session. The session is gone regardless.
	#[error("{0}")]
	BackendDelete(BackendError),

	/// A backend issued an id that is already registered.
	#[error("Session '{0}' is already registered")]
	DuplicateSession(String),
}

impl Error {
	/// Protocol a failed session request is answered in.
	///
	/// Failures carry no negotiated protocol, so they always answer in W3C.
	pub fn response_protocol(&self) -> Protocol {
		Protocol::W3c
	}
}

impl From<crate::validation::ValidationError> for Error {
	fn from(err: crate::validation::ValidationError) -> Self {
		Error::CapabilityValidation(err.to_string())
	}
}
