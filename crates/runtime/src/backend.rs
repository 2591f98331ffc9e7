//! Contract implemented by every inner automation driver.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use wdgate_protocol::{Capabilities, W3cCapabilities};

use crate::shutdown::ShutdownListener;

/// Failure reported by a backend driver.
///
/// The message is surfaced to clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
	message: String,
}

impl BackendError {
	pub fn new(message: impl Into<String>) -> Self {
		Self { message: message.into() }
	}

	pub fn message(&self) -> &str {
		&self.message
	}
}

/// A running automation engine instance serving one session.
///
/// Implementations are created per session by a [`BackendFactory`]. The
/// backend is the authority on session ids: whatever id `create_session`
/// returns is the id the gateway registers.
#[async_trait]
pub trait Backend: Send + Sync {
	/// Starts a session and returns its id and the capabilities it settled on.
	///
	/// `legacy` is the flat capability mirror when the client sent one; `w3c`
	/// is the collapsed W3C mirror when W3C negotiation succeeded.
	async fn create_session(
		&self,
		legacy: Option<Capabilities>,
		w3c: Option<W3cCapabilities>,
		extra: &[Value],
	) -> Result<(String, Value), BackendError>;

	/// Ends the session with the given id.
	async fn delete_session(&self, session_id: &str, extra: &[Value]) -> Result<(), BackendError>;

	/// Applies initial driver settings pulled from `settings[...]` capabilities.
	async fn update_settings(&self, _settings: Capabilities) -> Result<(), BackendError> {
		Ok(())
	}

	/// Hands out the receiving side of the unexpected-shutdown signal.
	///
	/// Returns `None` once the listener has been taken or when the backend
	/// never reports unexpected termination.
	fn take_shutdown_listener(&self) -> Option<ShutdownListener>;
}

/// Builds fresh backend instances for one driver descriptor.
pub trait BackendFactory: Send + Sync {
	fn create(&self) -> Arc<dyn Backend>;
}

impl<F> BackendFactory for F
where
	F: Fn() -> Arc<dyn Backend> + Send + Sync,
{
	fn create(&self) -> Arc<dyn Backend> {
		(self)()
	}
}
