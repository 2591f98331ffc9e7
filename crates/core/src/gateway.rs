//! Session gateway: negotiation, dispatch, and session lifetime.
//!
//! A create request walks through negotiation, driver resolution, optional
//! override eviction, and backend startup. Only a fully started session is
//! registered. Each registered session gets a watcher task for its backend's
//! unexpected-shutdown signal; the watcher is owned by the table entry.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use wdgate_protocol::{BuildInfo, Capabilities, Protocol, ServerStatus, SessionSummary};
use wdgate_runtime::{DriverRegistry, ShutdownListener};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::negotiate::{Negotiation, NegotiationRequest, negotiate};
use crate::settings::pull_settings;
use crate::table::{ActiveSession, SessionTable, ShutdownSubscription};
use crate::validation::{CapabilityValidator, W3cValidator};

/// A session that was started and registered.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedSession {
	/// Backend-issued session id.
	pub id: String,
	/// Capabilities the backend reported.
	pub capabilities: Value,
	/// Protocol the client should be answered in.
	pub protocol: Protocol,
}

/// Which driver a capability set resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
	pub name: String,
	pub automation_name: String,
	pub version: String,
}

/// Build metadata of this crate.
///
/// `WDGATE_GIT_SHA` and `WDGATE_BUILD_DATE` are picked up when set at compile time.
pub fn server_status() -> ServerStatus {
	ServerStatus {
		build: BuildInfo {
			version: env!("CARGO_PKG_VERSION").to_string(),
			git_sha: option_env!("WDGATE_GIT_SHA").map(str::to_string),
			built: option_env!("WDGATE_BUILD_DATE").map(str::to_string),
		},
	}
}

/// Front door for session create, delete, and listing.
///
/// Safe to share behind an [`Arc`] between concurrent callers.
pub struct SessionGateway {
	config: GatewayConfig,
	registry: DriverRegistry,
	validator: Arc<dyn CapabilityValidator>,
	table: Arc<SessionTable>,
	generation: AtomicU64,
}

impl SessionGateway {
	/// Creates a gateway using the standard W3C validator.
	pub fn new(config: GatewayConfig, registry: DriverRegistry) -> Self {
		Self {
			config,
			registry,
			validator: Arc::new(W3cValidator),
			table: Arc::new(SessionTable::new()),
			generation: AtomicU64::new(1),
		}
	}

	/// Replaces the capability validator.
	pub fn with_validator(mut self, validator: Arc<dyn CapabilityValidator>) -> Self {
		self.validator = validator;
		self
	}

	pub fn config(&self) -> &GatewayConfig {
		&self.config
	}

	pub fn registry(&self) -> &DriverRegistry {
		&self.registry
	}

	/// The active session table.
	pub fn table(&self) -> &SessionTable {
		&self.table
	}

	/// Negotiates capabilities with the configured defaults and constraints.
	pub async fn negotiate(&self, legacy: Option<&Value>, w3c: Option<&Value>) -> Result<Negotiation> {
		let request = NegotiationRequest {
			legacy,
			w3c,
			constraints: &self.config.constraints,
			defaults: &self.config.default_capabilities,
		};
		negotiate(self.validator.as_ref(), &request).await
	}

	/// Starts a new session.
	///
	/// Nothing is registered unless the backend started successfully. In
	/// override mode every active session is deleted first; failures there
	/// are logged and ignored. Initial settings come from the mirror of the
	/// negotiated protocol; if the backend rejects them the session is
	/// discarded and the error returned.
	pub async fn create_session(&self, legacy: Option<Value>, w3c: Option<Value>) -> Result<CreatedSession> {
		let Negotiation {
			protocol,
			capabilities: caps,
			legacy: mut legacy_mirror,
			w3c: mut w3c_mirror,
		} = self.negotiate(legacy.as_ref(), w3c.as_ref()).await?;

		let resolved = self.registry.resolve(&caps)?;
		let driver = resolved.descriptor.name.clone();
		info!(
			target = "wdgate.gateway",
			driver = %driver,
			driver_version = %resolved.descriptor.version,
			protocol = %protocol,
			"creating session"
		);

		let legacy_settings = legacy_mirror.as_mut().map(pull_settings).unwrap_or_default();
		let w3c_settings = w3c_mirror
			.as_mut()
			.map(|mirror| pull_settings(&mut mirror.always_match))
			.unwrap_or_default();
		let settings = match protocol {
			Protocol::W3c => w3c_settings,
			Protocol::Legacy => legacy_settings,
		};

		if self.config.session_override {
			self.delete_all("session override").await;
		}

		let backend = resolved.factory.create();
		let (id, capabilities) = backend
			.create_session(legacy_mirror, w3c_mirror, &[])
			.await
			.map_err(|err| {
				warn!(target = "wdgate.gateway", driver = %driver, error = %err, "backend failed to create session");
				Error::BackendCreate(err)
			})?;

		let generation = self.generation.fetch_add(1, Ordering::SeqCst);
		let (subscription, registered) = match backend.take_shutdown_listener() {
			Some(listener) => {
				let (tx, rx) = oneshot::channel();
				(self.watch_shutdown(id.clone(), generation, listener, rx), Some(tx))
			}
			None => (ShutdownSubscription::none(), None),
		};
		let session = ActiveSession {
			backend: Arc::clone(&backend),
			capabilities: capabilities.clone(),
			driver: driver.clone(),
			generation,
			subscription,
		};
		if let Err(err) = self.table.add(id.clone(), session) {
			warn!(target = "wdgate.gateway", session_id = %id, "backend issued a duplicate session id");
			if let Err(delete_err) = backend.delete_session(&id, &[]).await {
				warn!(target = "wdgate.gateway", session_id = %id, error = %delete_err, "failed to discard duplicate session");
			}
			return Err(err);
		}
		if let Some(registered) = registered {
			let _ = registered.send(());
		}
		info!(target = "wdgate.gateway", session_id = %id, driver = %driver, "session created");

		if !settings.is_empty() {
			debug!(target = "wdgate.gateway", session_id = %id, settings = ?settings.keys().collect::<Vec<_>>(), "applying initial settings");
			if let Err(err) = backend.update_settings(settings).await {
				warn!(target = "wdgate.gateway", session_id = %id, error = %err, "failed to apply initial settings; discarding session");
				self.table.remove_if_generation(&id, generation);
				if let Err(delete_err) = backend.delete_session(&id, &[]).await {
					warn!(target = "wdgate.gateway", session_id = %id, error = %delete_err, "failed to discard session");
				}
				return Err(Error::SessionSettings(err));
			}
		}

		Ok(CreatedSession {
			id,
			capabilities,
			protocol,
		})
	}

	/// Ends a session. Unknown ids succeed without doing anything.
	///
	/// The session leaves the table even when the backend reports an error.
	/// An entry registered under the same id while the backend call was
	/// pending is left alone.
	pub async fn delete_session(&self, id: &str) -> Result<()> {
		let Some((backend, generation)) = self.table.lookup(id) else {
			debug!(target = "wdgate.gateway", session_id = %id, "delete requested for unknown session");
			return Ok(());
		};

		let outcome = backend.delete_session(id, &[]).await;
		self.table.remove_if_generation(id, generation);
		match outcome {
			Ok(()) => {
				info!(target = "wdgate.gateway", session_id = %id, "session deleted");
				Ok(())
			}
			Err(err) => {
				warn!(target = "wdgate.gateway", session_id = %id, error = %err, "backend failed to delete session");
				Err(Error::BackendDelete(err))
			}
		}
	}

	/// Lists active sessions in creation order.
	pub fn sessions(&self) -> Vec<SessionSummary> {
		self.table.list()
	}

	pub fn session_exists(&self, id: &str) -> bool {
		self.table.contains(id)
	}

	/// Build metadata for the status endpoint.
	pub fn status(&self) -> ServerStatus {
		server_status()
	}

	/// Reports which driver would serve `caps` without starting anything.
	pub fn resolve_driver(&self, caps: &Capabilities) -> Result<DriverSummary> {
		let resolved = self.registry.resolve(caps)?;
		Ok(DriverSummary {
			name: resolved.descriptor.name,
			automation_name: resolved.descriptor.automation_name,
			version: resolved.descriptor.version,
		})
	}

	/// Deletes every active session, logging failures.
	pub async fn shutdown(&self) {
		self.delete_all("gateway shutdown").await;
	}

	async fn delete_all(&self, reason: &str) {
		let drained = self.table.drain();
		if drained.is_empty() {
			return;
		}
		info!(target = "wdgate.gateway", count = drained.len(), reason, "deleting active sessions");

		let deletions = drained.into_iter().map(|(id, session)| async move {
			if let Err(err) = session.backend.delete_session(&id, &[]).await {
				warn!(target = "wdgate.gateway", session_id = %id, error = %err, reason, "failed to delete session");
			}
		});
		join_all(deletions).await;
	}

	fn watch_shutdown(
		&self,
		id: String,
		generation: u64,
		listener: ShutdownListener,
		registered: oneshot::Receiver<()>,
	) -> ShutdownSubscription {
		let table: Weak<SessionTable> = Arc::downgrade(&self.table);
		let watcher = tokio::spawn(async move {
			if registered.await.is_err() {
				return;
			}
			let Some(event) = listener.wait().await else {
				return;
			};
			match &event.error {
				Some(err) => warn!(target = "wdgate.gateway", session_id = %id, error = %err, "backend shut down unexpectedly"),
				None => warn!(target = "wdgate.gateway", session_id = %id, "backend shut down unexpectedly"),
			}
			if let Some(table) = table.upgrade() {
				if table.remove_if_generation(&id, generation).is_some() {
					info!(target = "wdgate.gateway", session_id = %id, "removed session after backend shutdown");
				}
			}
		});
		ShutdownSubscription::new(watcher)
	}
}

impl std::fmt::Debug for SessionGateway {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionGateway")
			.field("config", &self.config)
			.field("registry", &self.registry)
			.field("table", &self.table)
			.finish_non_exhaustive()
	}
}
