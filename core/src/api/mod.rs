//! HTTP and WebSocket surface
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | `GET` | `/items` | list records |
//! | `POST` | `/items` | add a record |
//! | `PUT` | `/items/:id` | replace a record |
//! | `DELETE` | `/items/:id` | delete a record |
//! | `POST` | `/notify_reload` | broadcast a reload |
//! | `GET` | `/export` | write the server-side CSV export |
//! | `GET` | `/ping` | liveness |
//! | `GET` | `/ws` | reload notification stream |
//!
//! Writes go through the shared [`RecordStore`], whose sink is the server's
//! [`ChangeNotifier`], so each write reaches every connected listener once.

mod error;
mod ws;

pub use error::ApiError;

use crate::domain::{InventoryItem, ItemInput};
use crate::export::export_items_csv;
use crate::notifier::{ChangeNotifier, NotifyEvent};
use crate::store::RecordStore;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiState {
	pub store: Arc<RecordStore>,
	pub notifier: ChangeNotifier,
	/// Target of `GET /export`
	pub export_path: PathBuf,
}

pub fn router(state: ApiState) -> Router {
	Router::new()
		.route("/items", get(list_items).post(add_item))
		.route("/items/:id", put(update_item).delete(delete_item))
		.route("/notify_reload", post(notify_reload))
		.route("/export", get(export))
		.route("/ping", get(ping))
		.route("/ws", get(ws::upgrade))
		.with_state(state)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve(
	listener: TcpListener,
	state: ApiState,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
	if let Ok(addr) = listener.local_addr() {
		info!("Listening on http://{}", addr);
	}

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown)
		.await
}

fn ok() -> Json<Value> {
	Json(json!({ "status": "ok" }))
}

async fn list_items(State(state): State<ApiState>) -> ApiResult<Json<Vec<InventoryItem>>> {
	Ok(Json(state.store.list().await?))
}

async fn add_item(
	State(state): State<ApiState>,
	payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
	let Json(input) = payload?;
	let id = state.store.add(input).await?;
	Ok(Json(json!({ "status": "ok", "id": id })))
}

async fn update_item(
	State(state): State<ApiState>,
	Path(id): Path<i32>,
	payload: Result<Json<ItemInput>, JsonRejection>,
) -> ApiResult<Json<Value>> {
	let Json(input) = payload?;
	state.store.update(id, input).await?;
	Ok(ok())
}

async fn delete_item(
	State(state): State<ApiState>,
	Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
	state.store.delete(id).await?;
	Ok(ok())
}

async fn notify_reload(State(state): State<ApiState>) -> Json<Value> {
	state.notifier.broadcast(NotifyEvent::Reload);
	ok()
}

async fn export(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
	let items = state.store.list().await?;
	let path = state.export_path.clone();

	let written = tokio::task::spawn_blocking(move || export_items_csv(&items, &path))
		.await
		.map_err(|e| ApiError::Internal(e.to_string()))??;

	info!(rows = written, "Server-side export written");
	Ok(Json(json!({
		"status": "ok",
		"path": state.export_path.display().to_string(),
	})))
}

async fn ping() -> Json<Value> {
	Json(json!({ "status": "ok", "message": "pong" }))
}
