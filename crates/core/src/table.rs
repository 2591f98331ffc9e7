//! Active session table.
//!
//! Sessions are kept in an [`IndexMap`] behind a [`parking_lot::Mutex`], so
//! listing preserves creation order and removal is O(1). The lock is only held
//! for the map operation itself and never across an `.await`.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use wdgate_protocol::SessionSummary;
use wdgate_runtime::Backend;

use crate::error::{Error, Result};

/// RAII handle for a session's unexpected-shutdown watcher.
///
/// Dropping it aborts the watcher task, so a removed session never leaves a
/// handler behind.
pub struct ShutdownSubscription {
	watcher: Option<JoinHandle<()>>,
}

impl ShutdownSubscription {
	pub fn new(watcher: JoinHandle<()>) -> Self {
		Self { watcher: Some(watcher) }
	}

	/// A subscription for a backend that never reports shutdowns.
	pub fn none() -> Self {
		Self { watcher: None }
	}

	/// Returns `true` while a watcher task is attached and still running.
	pub fn is_active(&self) -> bool {
		self.watcher.as_ref().is_some_and(|watcher| !watcher.is_finished())
	}
}

impl Drop for ShutdownSubscription {
	fn drop(&mut self) {
		if let Some(watcher) = self.watcher.take() {
			watcher.abort();
		}
	}
}

impl std::fmt::Debug for ShutdownSubscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ShutdownSubscription")
			.field("active", &self.is_active())
			.finish()
	}
}

/// One registered session.
pub struct ActiveSession {
	pub backend: Arc<dyn Backend>,
	/// Capabilities the backend reported at creation.
	pub capabilities: Value,
	/// Name of the driver descriptor serving this session.
	pub driver: String,
	/// Registration counter value, distinguishing reuses of the same id.
	pub generation: u64,
	pub subscription: ShutdownSubscription,
}

impl std::fmt::Debug for ActiveSession {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActiveSession")
			.field("driver", &self.driver)
			.field("generation", &self.generation)
			.field("subscription", &self.subscription)
			.finish_non_exhaustive()
	}
}

/// Insertion-ordered map of session id to [`ActiveSession`].
#[derive(Default)]
pub struct SessionTable {
	sessions: Mutex<IndexMap<String, ActiveSession>>,
}

impl SessionTable {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a session; fails if the id is already present.
	pub fn add(&self, id: impl Into<String>, session: ActiveSession) -> Result<()> {
		let id = id.into();
		let mut sessions = self.sessions.lock();
		if sessions.contains_key(&id) {
			return Err(Error::DuplicateSession(id));
		}
		sessions.insert(id, session);
		Ok(())
	}

	/// Removes a session. Removing an unknown id returns `None`.
	pub fn remove(&self, id: &str) -> Option<ActiveSession> {
		self.sessions.lock().shift_remove(id)
	}

	/// Removes a session only if it is still the registration `generation`.
	pub fn remove_if_generation(&self, id: &str, generation: u64) -> Option<ActiveSession> {
		let mut sessions = self.sessions.lock();
		if sessions.get(id).is_some_and(|session| session.generation == generation) {
			sessions.shift_remove(id)
		} else {
			None
		}
	}

	/// Returns the backend serving `id` together with its registration generation.
	pub fn lookup(&self, id: &str) -> Option<(Arc<dyn Backend>, u64)> {
		self.sessions
			.lock()
			.get(id)
			.map(|session| (Arc::clone(&session.backend), session.generation))
	}

	pub fn contains(&self, id: &str) -> bool {
		self.sessions.lock().contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.sessions.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.sessions.lock().is_empty()
	}

	/// Snapshot of every session in creation order.
	pub fn list(&self) -> Vec<SessionSummary> {
		self.sessions
			.lock()
			.iter()
			.map(|(id, session)| SessionSummary {
				id: id.clone(),
				capabilities: session.capabilities.clone(),
			})
			.collect()
	}

	/// Removes and returns every session in creation order.
	pub fn drain(&self) -> Vec<(String, ActiveSession)> {
		self.sessions.lock().drain(..).collect()
	}
}

impl std::fmt::Debug for SessionTable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionTable")
			.field("sessions", &self.sessions.lock().keys().collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};

	use async_trait::async_trait;
	use serde_json::json;
	use wdgate_protocol::{Capabilities, W3cCapabilities};
	use wdgate_runtime::{BackendError, ShutdownListener};

	use super::*;

	struct Inert;

	#[async_trait]
	impl Backend for Inert {
		async fn create_session(
			&self,
			_legacy: Option<Capabilities>,
			_w3c: Option<W3cCapabilities>,
			_extra: &[Value],
		) -> std::result::Result<(String, Value), BackendError> {
			Ok(("inert".into(), json!({})))
		}

		async fn delete_session(&self, _id: &str, _extra: &[Value]) -> std::result::Result<(), BackendError> {
			Ok(())
		}

		fn take_shutdown_listener(&self) -> Option<ShutdownListener> {
			None
		}
	}

	fn session(generation: u64, capabilities: Value) -> ActiveSession {
		ActiveSession {
			backend: Arc::new(Inert),
			capabilities,
			driver: "inert".into(),
			generation,
			subscription: ShutdownSubscription::none(),
		}
	}

	#[test]
	fn add_rejects_duplicates() {
		let table = SessionTable::new();
		table.add("a", session(1, json!({}))).unwrap();
		let err = table.add("a", session(2, json!({}))).unwrap_err();
		assert!(matches!(err, Error::DuplicateSession(ref id) if id == "a"));
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn remove_is_idempotent() {
		let table = SessionTable::new();
		table.add("a", session(1, json!({}))).unwrap();
		assert!(table.remove("a").is_some());
		assert!(table.remove("a").is_none());
		assert!(table.is_empty());
	}

	#[test]
	fn list_keeps_creation_order_after_removal() {
		let table = SessionTable::new();
		for (i, id) in ["c", "a", "b", "d"].iter().enumerate() {
			table.add(*id, session(i as u64, json!({"n": i}))).unwrap();
		}
		table.remove("a");

		let listed: Vec<_> = table.list().into_iter().map(|s| (s.id, s.capabilities)).collect();
		assert_eq!(
			listed,
			vec![
				("c".to_string(), json!({"n": 0})),
				("b".to_string(), json!({"n": 2})),
				("d".to_string(), json!({"n": 3})),
			]
		);
	}

	#[test]
	fn stale_generation_does_not_remove() {
		let table = SessionTable::new();
		table.add("a", session(7, json!({}))).unwrap();
		assert!(table.remove_if_generation("a", 6).is_none());
		assert!(table.contains("a"));
		assert!(table.remove_if_generation("a", 7).is_some());
		assert!(!table.contains("a"));
	}

	#[test]
	fn lookup_reports_generation() {
		let table = SessionTable::new();
		table.add("a", session(3, json!({}))).unwrap();
		assert_eq!(table.lookup("a").map(|(_, generation)| generation), Some(3));
		assert!(table.lookup("b").is_none());
	}

	#[test]
	fn drain_empties_in_order() {
		let table = SessionTable::new();
		table.add("x", session(1, json!({}))).unwrap();
		table.add("y", session(2, json!({}))).unwrap();
		let drained: Vec<String> = table.drain().into_iter().map(|(id, _)| id).collect();
		assert_eq!(drained, vec!["x", "y"]);
		assert!(table.is_empty());
	}

	#[tokio::test]
	async fn dropping_subscription_aborts_watcher() {
		let finished = Arc::new(AtomicBool::new(false));
		let flag = Arc::clone(&finished);
		let watcher = tokio::spawn(async move {
			tokio::time::sleep(std::time::Duration::from_millis(50)).await;
			flag.store(true, Ordering::SeqCst);
		});

		let subscription = ShutdownSubscription::new(watcher);
		assert!(subscription.is_active());
		drop(subscription);

		tokio::time::sleep(std::time::Duration::from_millis(100)).await;
		assert!(!finished.load(Ordering::SeqCst));
	}
}
