//! Change notification fan-out
//!
//! [`ChangeNotifier`] owns the set of live listener connections. Each
//! connection gets its own bounded queue, so a slow or dead listener can
//! never hold up delivery to the others. A broadcast works on a snapshot of
//! the set and only prunes dead connections after delivery has been attempted
//! to everyone.

pub mod remote;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

pub use remote::RemoteNotifier;

/// Per-connection queue depth. A full queue already holds a pending reload.
const CONNECTION_QUEUE_CAPACITY: usize = 16;

/// Unique identifier for a registered listener connection.
pub type ConnectionId = u64;

/// Signals pushed to listeners. Carries no payload; receivers re-read the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifyEvent {
	Reload,
}

impl NotifyEvent {
	/// Wire form, e.g. `{"event":"reload"}`
	pub fn to_message(&self) -> Result<String, TransportError> {
		serde_json::to_string(self).map_err(|e| TransportError::Malformed(e.to_string()))
	}

	/// Parse an inbound text frame.
	///
	/// Returns `Ok(None)` for well-formed messages carrying an event this
	/// client does not know, and an error for anything that is not a JSON
	/// object with a string `event` field.
	pub fn parse(text: &str) -> Result<Option<Self>, TransportError> {
		let value: serde_json::Value =
			serde_json::from_str(text).map_err(|e| TransportError::Malformed(e.to_string()))?;

		let event = value
			.get("event")
			.and_then(|event| event.as_str())
			.ok_or_else(|| TransportError::Malformed(format!("missing event field: {text}")))?;

		Ok(match event {
			"reload" => Some(Self::Reload),
			_ => None,
		})
	}
}

/// Failures on the notification transport. Always logged, never surfaced.
#[derive(Error, Debug)]
pub enum TransportError {
	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Server responded with {0}")]
	Status(reqwest::StatusCode),

	#[error("Malformed message: {0}")]
	Malformed(String),
}

/// Receives a call after every committed store mutation.
///
/// Implementations must swallow their own failures: a sink can never fail
/// or undo the write that triggered it.
#[async_trait]
pub trait ChangeSink: Send + Sync {
	async fn notify_changed(&self);
}

/// Sink for stores that have nobody to tell.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl ChangeSink for NullSink {
	async fn notify_changed(&self) {}
}

/// Fan-out broadcaster over the currently connected listeners.
///
/// Clones share the same connection set.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
	inner: Arc<NotifierInner>,
}

#[derive(Debug)]
struct NotifierInner {
	connections: RwLock<HashMap<ConnectionId, mpsc::Sender<NotifyEvent>>>,
	next_id: AtomicU64,
}

impl ChangeNotifier {
	pub fn new() -> Self {
		Self {
			inner: Arc::new(NotifierInner {
				connections: RwLock::new(HashMap::new()),
				next_id: AtomicU64::new(1),
			}),
		}
	}

	/// Register a new listener connection and return its id and event queue.
	pub fn register(&self) -> (ConnectionId, mpsc::Receiver<NotifyEvent>) {
		let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
		let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);

		self.inner.connections.write().insert(id, tx);
		debug!(connection_id = id, "listener registered");

		(id, rx)
	}

	/// Remove a connection, returning whether it was still registered.
	pub fn unregister(&self, id: ConnectionId) -> bool {
		let removed = self.inner.connections.write().remove(&id).is_some();
		if removed {
			debug!(connection_id = id, "listener unregistered");
		}
		removed
	}

	/// Deliver `event` to every registered connection.
	///
	/// Connections whose receiving side is gone are pruned. Returns how many
	/// connections now have the event queued.
	pub fn broadcast(&self, event: NotifyEvent) -> usize {
		let snapshot: Vec<(ConnectionId, mpsc::Sender<NotifyEvent>)> = self
			.inner
			.connections
			.read()
			.iter()
			.map(|(id, tx)| (*id, tx.clone()))
			.collect();

		let mut delivered = 0;
		let mut dead = Vec::new();

		for (id, tx) in snapshot {
			match tx.try_send(event) {
				Ok(()) => delivered += 1,
				Err(TrySendError::Full(_)) => {
					debug!(connection_id = id, "reload already pending, coalescing");
					delivered += 1;
				}
				Err(TrySendError::Closed(_)) => dead.push(id),
			}
		}

		if !dead.is_empty() {
			let mut connections = self.inner.connections.write();
			for id in &dead {
				connections.remove(id);
			}
			warn!(dropped = dead.len(), "removed closed listener connections");
		}

		debug!(?event, delivered, "broadcast complete");
		delivered
	}

	/// Drop every connection. Their tasks see the queue close and hang up.
	pub fn close_all(&self) {
		let count = {
			let mut connections = self.inner.connections.write();
			let count = connections.len();
			connections.clear();
			count
		};
		if count > 0 {
			debug!(count, "closed all listener connections");
		}
	}

	pub fn connection_count(&self) -> usize {
		self.inner.connections.read().len()
	}
}

impl Default for ChangeNotifier {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ChangeSink for ChangeNotifier {
	async fn notify_changed(&self) {
		self.broadcast(NotifyEvent::Reload);
	}
}
