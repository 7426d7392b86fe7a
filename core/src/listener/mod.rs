//! Reload listener
//!
//! [`ListenerClient`] keeps one WebSocket connection to the notification
//! server open from a background task. Every `reload` event it receives runs
//! the supplied callback. Any failure (refused connection, reset, malformed
//! frame, close) is logged, followed by a fixed delay and a fresh connection
//! attempt; the loop only ends when it is stopped.

use crate::config::AppConfig;
use crate::notifier::{NotifyEvent, TransportError};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
	Disconnected,
	Connecting,
	Connected,
	/// Only reached through [`ListenerHandle::stop`]
	Stopped,
}

enum ListenOutcome {
	Closed,
	Shutdown,
}

#[derive(Debug, Clone)]
pub struct ListenerClient {
	url: String,
	reconnect_delay: Duration,
}

impl ListenerClient {
	pub fn new(url: impl Into<String>, reconnect_delay: Duration) -> Self {
		Self {
			url: url.into(),
			reconnect_delay,
		}
	}

	pub fn from_config(config: &AppConfig) -> Self {
		Self::new(config.ws_url(), config.reconnect_delay())
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Spawn the connect/listen loop; `callback` runs once per reload event
	/// on the listener task.
	///
	/// Dropping the returned handle stops the listener.
	pub fn start<F>(self, callback: F) -> ListenerHandle
	where
		F: Fn() + Send + Sync + 'static,
	{
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
		let attempts = Arc::new(AtomicU64::new(0));

		let task = tokio::spawn(run(
			self,
			callback,
			shutdown_rx,
			state_tx,
			Arc::clone(&attempts),
		));

		ListenerHandle {
			shutdown_tx,
			state_rx,
			attempts,
			task,
		}
	}

	/// Like [`ListenerClient::start`], but each reload is delivered as a unit
	/// message that the owner drains on its own schedule.
	pub fn start_channel(self) -> (ListenerHandle, mpsc::UnboundedReceiver<()>) {
		let (tx, rx) = mpsc::unbounded_channel();
		let handle = self.start(move || {
			// The owner went away; nothing left to wake.
			let _ = tx.send(());
		});
		(handle, rx)
	}
}

pub struct ListenerHandle {
	shutdown_tx: watch::Sender<bool>,
	state_rx: watch::Receiver<ListenerState>,
	attempts: Arc<AtomicU64>,
	task: JoinHandle<()>,
}

impl ListenerHandle {
	/// Ask the loop to exit at its next suspension point. No callback runs
	/// once the request has been observed.
	pub fn stop(&self) {
		self.shutdown_tx.send_replace(true);
	}

	pub fn state(&self) -> ListenerState {
		*self.state_rx.borrow()
	}

	pub fn subscribe_state(&self) -> watch::Receiver<ListenerState> {
		self.state_rx.clone()
	}

	/// Number of connection attempts made so far
	pub fn connect_attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Wait for the loop to exit. Without a prior [`ListenerHandle::stop`]
	/// this only returns if the task dies.
	pub async fn join(self) {
		let Self {
			task, shutdown_tx, ..
		} = self;
		if let Err(e) = task.await {
			warn!(error = %e, "Listener task ended abnormally");
		}
		drop(shutdown_tx);
	}

	/// Stop the loop and wait for it to exit
	pub async fn shutdown(self) {
		self.stop();
		self.join().await;
	}
}

async fn run<F>(
	client: ListenerClient,
	callback: F,
	mut shutdown_rx: watch::Receiver<bool>,
	state_tx: watch::Sender<ListenerState>,
	attempts: Arc<AtomicU64>,
) where
	F: Fn() + Send + Sync + 'static,
{
	let url = client.url;

	loop {
		if *shutdown_rx.borrow() {
			break;
		}

		state_tx.send_replace(ListenerState::Connecting);
		attempts.fetch_add(1, Ordering::Relaxed);
		debug!(url = %url, "connecting to notification server");

		let connected = tokio::select! {
			result = tokio_tungstenite::connect_async(url.as_str()) => result,
			_ = shutdown_rx.changed() => break,
		};

		match connected {
			Ok((stream, _response)) => {
				state_tx.send_replace(ListenerState::Connected);
				info!(url = %url, "Connected to notification server");

				match listen(stream, &callback, &mut shutdown_rx).await {
					Ok(ListenOutcome::Shutdown) => break,
					Ok(ListenOutcome::Closed) => {
						info!(url = %url, "Notification server closed the connection");
					}
					Err(e) => warn!(url = %url, error = %e, "Notification connection lost"),
				}
			}
			Err(e) => {
				warn!(url = %url, error = %e, "Failed to connect to notification server");
			}
		}

		state_tx.send_replace(ListenerState::Disconnected);
		debug!(delay = ?client.reconnect_delay, "scheduling reconnect");

		tokio::select! {
			() = tokio::time::sleep(client.reconnect_delay) => {}
			_ = shutdown_rx.changed() => break,
		}
	}

	state_tx.send_replace(ListenerState::Stopped);
	debug!(url = %url, "listener stopped");
}

async fn listen<F>(
	stream: WsStream,
	callback: &F,
	shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<ListenOutcome, TransportError>
where
	F: Fn() + Sync,
{
	let (mut write, mut read) = stream.split();

	loop {
		tokio::select! {
			msg = read.next() => match msg {
				Some(Ok(Message::Text(text))) => match NotifyEvent::parse(text.as_str())? {
					Some(NotifyEvent::Reload) => {
						if *shutdown_rx.borrow() {
							return Ok(ListenOutcome::Shutdown);
						}
						debug!("reload event received");
						callback();
					}
					None => debug!(message = %text.as_str(), "ignoring unknown notification"),
				},
				Some(Ok(Message::Ping(data))) => write.send(Message::Pong(data)).await?,
				Some(Ok(Message::Close(_))) | None => return Ok(ListenOutcome::Closed),
				Some(Ok(_)) => {} // Binary, Pong, Frame
				Some(Err(e)) => return Err(e.into()),
			},
			_ = shutdown_rx.changed() => {
				let _ = write.send(Message::Close(None)).await;
				return Ok(ListenOutcome::Shutdown);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::TcpListener;

	async fn unused_addr() -> std::net::SocketAddr {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		listener.local_addr().unwrap()
	}

	#[tokio::test]
	async fn retries_with_fixed_delay_while_server_is_down() {
		let addr = unused_addr().await;
		let client = ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_millis(50));

		let handle = client.start(|| {});
		tokio::time::sleep(Duration::from_millis(400)).await;

		assert!(
			handle.connect_attempts() >= 3,
			"only {} attempts",
			handle.connect_attempts()
		);
		assert_ne!(handle.state(), ListenerState::Connected);
		assert_ne!(handle.state(), ListenerState::Stopped);

		handle.shutdown().await;
	}

	#[tokio::test]
	async fn stop_ends_the_loop() {
		let addr = unused_addr().await;
		let client = ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_secs(60));

		let handle = client.start(|| {});
		let mut state = handle.subscribe_state();
		handle.stop();

		tokio::time::timeout(Duration::from_secs(5), async {
			while *state.borrow_and_update() != ListenerState::Stopped {
				state.changed().await.unwrap();
			}
		})
		.await
		.expect("listener did not stop");
	}

	#[tokio::test]
	async fn join_returns_after_stop() {
		let addr = unused_addr().await;
		let client = ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_secs(60));

		let handle = client.start(|| {});
		let state = handle.subscribe_state();
		handle.stop();

		tokio::time::timeout(Duration::from_secs(5), handle.join())
			.await
			.expect("join did not return");
		assert_eq!(*state.borrow(), ListenerState::Stopped);
	}

	#[tokio::test]
	async fn dropping_the_handle_stops_the_listener() {
		let addr = unused_addr().await;
		let client = ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_secs(60));

		let handle = client.start(|| {});
		let mut state = handle.subscribe_state();
		drop(handle);

		tokio::time::timeout(Duration::from_secs(5), async {
			while *state.borrow_and_update() != ListenerState::Stopped {
				if state.changed().await.is_err() {
					break;
				}
			}
		})
		.await
		.expect("listener did not stop");
	}
}
