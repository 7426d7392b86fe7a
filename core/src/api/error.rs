//! HTTP error responses

use crate::export::ExportError;
use crate::store::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
	#[error(transparent)]
	Store(#[from] StoreError),

	#[error(transparent)]
	Export(#[from] ExportError),

	#[error(transparent)]
	Body(#[from] JsonRejection),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl ApiError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Store(e) if e.is_validation() => StatusCode::UNPROCESSABLE_ENTITY,
			Self::Body(rejection) => rejection.status(),
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			error!(error = %self, "Request failed");
		}

		let detail = match &self {
			Self::Body(rejection) => rejection.body_text(),
			other => other.to_string(),
		};

		(status, Json(json!({ "status": "error", "detail": detail }))).into_response()
	}
}
