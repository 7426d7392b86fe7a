//! `/ws`: one task per listener connection, fed by the notifier

use crate::notifier::ChangeNotifier;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use super::ApiState;

pub(super) async fn upgrade(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
	ws.on_upgrade(move |socket| serve_listener(socket, state.notifier))
}

async fn serve_listener(socket: WebSocket, notifier: ChangeNotifier) {
	let (id, mut events) = notifier.register();
	let (mut sender, mut receiver) = socket.split();

	loop {
		tokio::select! {
			event = events.recv() => {
				let Some(event) = event else {
					// Notifier dropped us (shutdown)
					let _ = sender.send(Message::Close(None)).await;
					break;
				};

				let text = match event.to_message() {
					Ok(text) => text,
					Err(e) => {
						warn!(connection_id = id, error = %e, "Failed to encode event");
						continue;
					}
				};

				if let Err(e) = sender.send(Message::Text(text)).await {
					debug!(connection_id = id, error = %e, "send failed, dropping listener");
					break;
				}
			}
			incoming = receiver.next() => match incoming {
				Some(Ok(Message::Close(_))) | None => break,
				// Inbound content is ignored
				Some(Ok(_)) => {}
				Some(Err(e)) => {
					debug!(connection_id = id, error = %e, "listener connection error");
					break;
				}
			}
		}
	}

	notifier.unregister(id);
}
