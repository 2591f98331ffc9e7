//! Single-fire unexpected-shutdown signal between a backend and the gateway.
//!
//! A backend keeps the [`ShutdownNotifier`] and fires it at most once when it
//! dies outside of an explicit delete. The gateway takes the
//! [`ShutdownListener`] when the session is registered and drops it again when
//! the session leaves the table, so no handler outlives its session.

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::backend::BackendError;

/// Payload delivered when a backend terminates unexpectedly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownEvent {
	/// Error that caused the termination, when the backend reported one.
	pub error: Option<BackendError>,
}

/// Creates a connected notifier/listener pair.
pub fn shutdown_channel() -> (ShutdownNotifier, ShutdownListener) {
	let (tx, rx) = oneshot::channel();
	(ShutdownNotifier { tx: Mutex::new(Some(tx)) }, ShutdownListener { rx })
}

/// Sending half, owned by the backend.
#[derive(Debug)]
pub struct ShutdownNotifier {
	tx: Mutex<Option<oneshot::Sender<ShutdownEvent>>>,
}

impl ShutdownNotifier {
	/// Fires the signal. Returns `false` if it already fired or nobody listens.
	pub fn notify(&self, error: Option<BackendError>) -> bool {
		let Some(tx) = self.tx.lock().take() else {
			return false;
		};
		tx.send(ShutdownEvent { error }).is_ok()
	}

	/// Returns `true` once [`notify`](Self::notify) has been called.
	pub fn has_fired(&self) -> bool {
		self.tx.lock().is_none()
	}
}

/// Receiving half, taken by the gateway at registration time.
#[derive(Debug)]
pub struct ShutdownListener {
	rx: oneshot::Receiver<ShutdownEvent>,
}

impl ShutdownListener {
	/// Waits for the signal.
	///
	/// Resolves to `None` when the notifier was dropped without firing.
	pub async fn wait(self) -> Option<ShutdownEvent> {
		self.rx.await.ok()
	}
}
