//! End-to-end reload propagation over real sockets

use futures_util::SinkExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use stash_core::api::{self, ApiState};
use stash_core::{ChangeNotifier, ItemInput, ListenerClient, RecordStore, RemoteNotifier};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
	addr: SocketAddr,
	notifier: ChangeNotifier,
	export_path: PathBuf,
	shutdown: Option<oneshot::Sender<()>>,
	task: JoinHandle<std::io::Result<()>>,
	_dir: TempDir,
}

impl TestServer {
	async fn start() -> Self {
		let dir = TempDir::new().unwrap();
		let notifier = ChangeNotifier::new();
		let store = RecordStore::open(
			&dir.path().join("inventory.db"),
			Arc::new(notifier.clone()),
		)
		.await
		.unwrap();

		let export_path = dir.path().join("export.csv");
		let state = ApiState {
			store: Arc::new(store),
			notifier: notifier.clone(),
			export_path: export_path.clone(),
		};

		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		let (tx, rx) = oneshot::channel::<()>();
		let task = tokio::spawn(api::serve(listener, state, async {
			let _ = rx.await;
		}));

		Self {
			addr,
			notifier,
			export_path,
			shutdown: Some(tx),
			task,
			_dir: dir,
		}
	}

	fn url(&self, path: &str) -> String {
		format!("http://{}{}", self.addr, path)
	}

	fn listener(&self) -> ListenerClient {
		ListenerClient::new(
			format!("ws://{}/ws", self.addr),
			Duration::from_millis(100),
		)
	}

	async fn wait_for_connections(&self, count: usize) {
		tokio::time::timeout(WAIT, async {
			while self.notifier.connection_count() != count {
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await
		.expect("listeners did not connect");
	}

	async fn stop(mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
		self.notifier.close_all();
		self.task.await.unwrap().unwrap();
	}
}

fn counting_callback() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
	let count = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&count);
	(count, move || {
		counter.fetch_add(1, Ordering::SeqCst);
	})
}

async fn wait_for_count(count: &AtomicUsize, expected: usize) {
	tokio::time::timeout(WAIT, async {
		while count.load(Ordering::SeqCst) < expected {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}
	})
	.await
	.unwrap_or_else(|_| {
		panic!(
			"expected {expected} reloads, saw {}",
			count.load(Ordering::SeqCst)
		)
	});
}

#[tokio::test]
async fn one_write_reaches_every_listener_once() {
	let server = TestServer::start().await;

	let (first_count, first_cb) = counting_callback();
	let (second_count, second_cb) = counting_callback();
	let first = server.listener().start(first_cb);
	let second = server.listener().start(second_cb);
	server.wait_for_connections(2).await;

	let response: Value = reqwest::Client::new()
		.post(server.url("/items"))
		.json(&json!({ "name": "Laptop", "category": "IT" }))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(response["status"], "ok");

	wait_for_count(&first_count, 1).await;
	wait_for_count(&second_count, 1).await;

	tokio::time::sleep(Duration::from_millis(200)).await;
	assert_eq!(first_count.load(Ordering::SeqCst), 1);
	assert_eq!(second_count.load(Ordering::SeqCst), 1);

	first.shutdown().await;
	second.shutdown().await;
	server.stop().await;
}

#[tokio::test]
async fn item_endpoints() {
	let server = TestServer::start().await;
	let client = reqwest::Client::new();

	let ping: Value = client
		.get(server.url("/ping"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(ping, json!({ "status": "ok", "message": "pong" }));

	let created: Value = client
		.post(server.url("/items"))
		.json(&json!({
			"name": "Drill",
			"category": "Narzędzia",
			"purchase_date": "2024-01-10",
			"serial_number": "SN1",
			"description": "cordless",
		}))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	let id = created["id"].as_i64().unwrap();

	let update = client
		.put(server.url(&format!("/items/{id}")))
		.json(&json!({
			"name": "Drill",
			"category": "IT",
			"purchase_date": "2024-01-10",
			"serial_number": "SN1",
			"description": "cordless",
		}))
		.send()
		.await
		.unwrap();
	assert!(update.status().is_success());

	let items: Value = client
		.get(server.url("/items"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(
		items,
		json!([{
			"id": id,
			"name": "Drill",
			"category": "IT",
			"purchase_date": "2024-01-10",
			"serial_number": "SN1",
			"description": "cordless",
		}])
	);

	let export: Value = client
		.get(server.url("/export"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(export["status"], "ok");
	let csv = std::fs::read_to_string(&server.export_path).unwrap();
	assert_eq!(
		csv,
		format!(
			"id,name,category,purchase_date,serial_number,description\n\
			 {id},Drill,IT,2024-01-10,SN1,cordless\n"
		)
	);

	for _ in 0..2 {
		let deleted = client
			.delete(server.url(&format!("/items/{id}")))
			.send()
			.await
			.unwrap();
		assert!(deleted.status().is_success());
	}

	let items: Value = client
		.get(server.url("/items"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(items, json!([]));

	server.stop().await;
}

#[tokio::test]
async fn invalid_items_are_rejected() {
	let server = TestServer::start().await;
	let client = reqwest::Client::new();

	let response = client
		.post(server.url("/items"))
		.json(&json!({ "name": "  " }))
		.send()
		.await
		.unwrap();
	assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
	let body: Value = response.json().await.unwrap();
	assert_eq!(body["status"], "error");
	assert!(body["detail"].is_string());

	let response = client
		.post(server.url("/items"))
		.json(&json!({ "category": "IT" }))
		.send()
		.await
		.unwrap();
	assert!(response.status().is_client_error());

	let items: Value = client
		.get(server.url("/items"))
		.send()
		.await
		.unwrap()
		.json()
		.await
		.unwrap();
	assert_eq!(items, json!([]));

	server.stop().await;
}

#[tokio::test]
async fn remote_notifier_reaches_listeners() {
	let server = TestServer::start().await;

	let (count, callback) = counting_callback();
	let listener = server.listener().start(callback);
	server.wait_for_connections(1).await;

	RemoteNotifier::new(server.url("/notify_reload"))
		.unwrap()
		.notify()
		.await
		.unwrap();

	wait_for_count(&count, 1).await;

	listener.shutdown().await;
	server.stop().await;
}

#[tokio::test]
async fn write_succeeds_when_notify_server_is_down() {
	let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = unused.local_addr().unwrap();
	drop(unused);

	let dir = TempDir::new().unwrap();
	let sink = RemoteNotifier::new(format!("http://{addr}/notify_reload")).unwrap();
	let store = RecordStore::open(&dir.path().join("inventory.db"), Arc::new(sink))
		.await
		.unwrap();

	let id = store.add(ItemInput::new("Lamp")).await.unwrap();
	assert_eq!(store.get(id).await.unwrap().unwrap().name, "Lamp");
}

#[tokio::test]
async fn dead_connection_does_not_block_others() {
	let server = TestServer::start().await;

	let (count, callback) = counting_callback();
	let listener = server.listener().start(callback);

	let (raw, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", server.addr))
		.await
		.unwrap();
	server.wait_for_connections(2).await;
	drop(raw);

	reqwest::Client::new()
		.post(server.url("/notify_reload"))
		.send()
		.await
		.unwrap();
	wait_for_count(&count, 1).await;

	server.wait_for_connections(1).await;

	listener.shutdown().await;
	server.stop().await;
}

/// Accepts one WebSocket connection and sends `frame` on it
async fn accept_and_send(listener: &TcpListener, frame: &str) -> WebSocketStream<TcpStream> {
	let (stream, _) = listener.accept().await.unwrap();
	let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
	ws.send(Message::Text(frame.to_string())).await.unwrap();
	ws
}

#[tokio::test]
async fn listener_reconnects_after_server_drop() {
	let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = server.local_addr().unwrap();
	let delay = Duration::from_millis(200);

	let (count, callback) = counting_callback();
	let handle = ListenerClient::new(format!("ws://{addr}/ws"), delay).start(callback);

	let first = accept_and_send(&server, r#"{"event":"reload"}"#).await;
	wait_for_count(&count, 1).await;

	let dropped_at = tokio::time::Instant::now();
	drop(first);

	let _second = tokio::time::timeout(WAIT, accept_and_send(&server, r#"{"event":"reload"}"#))
		.await
		.expect("listener did not reconnect");
	assert!(dropped_at.elapsed() < delay + Duration::from_secs(2));

	wait_for_count(&count, 2).await;
	assert!(handle.connect_attempts() >= 2);

	handle.shutdown().await;
}

#[tokio::test]
async fn malformed_frames_force_reconnect_and_unknown_events_are_ignored() {
	let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = server.local_addr().unwrap();

	let (count, callback) = counting_callback();
	let handle =
		ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_millis(100)).start(callback);

	let mut first = accept_and_send(&server, r#"{"event":"something_else"}"#).await;
	first.send(Message::Text("not json".into())).await.unwrap();

	let _second = tokio::time::timeout(WAIT, accept_and_send(&server, r#"{"event":"reload"}"#))
		.await
		.expect("listener did not reconnect after a malformed frame");

	wait_for_count(&count, 1).await;
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(count.load(Ordering::SeqCst), 1);

	handle.shutdown().await;
}

#[tokio::test]
async fn no_callbacks_after_stop_is_observed() {
	let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = server.local_addr().unwrap();

	let (count, callback) = counting_callback();
	let handle =
		ListenerClient::new(format!("ws://{addr}/ws"), Duration::from_millis(100)).start(callback);

	let mut ws = accept_and_send(&server, r#"{"event":"reload"}"#).await;
	wait_for_count(&count, 1).await;

	let flood = tokio::spawn(async move {
		loop {
			let frame = Message::Text(r#"{"event":"reload"}"#.to_string());
			if ws.send(frame).await.is_err() {
				break;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	});

	tokio::time::sleep(Duration::from_millis(50)).await;
	handle.stop();
	tokio::time::timeout(WAIT, handle.join())
		.await
		.expect("listener did not exit after stop");

	let after_join = count.load(Ordering::SeqCst);
	tokio::time::sleep(Duration::from_millis(200)).await;
	assert_eq!(count.load(Ordering::SeqCst), after_join);

	flood.abort();
}
