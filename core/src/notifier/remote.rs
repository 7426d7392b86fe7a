//! Notify a remote server that this process changed the shared database

use super::{ChangeSink, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Sink that asks the server at `url` (its `/notify_reload` endpoint) to
/// broadcast a reload to every other client.
#[derive(Debug, Clone)]
pub struct RemoteNotifier {
	client: reqwest::Client,
	url: String,
}

impl RemoteNotifier {
	pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
		let client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()?;

		Ok(Self {
			client,
			url: url.into(),
		})
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	pub async fn notify(&self) -> Result<(), TransportError> {
		let response = self.client.post(&self.url).send().await?;

		if !response.status().is_success() {
			return Err(TransportError::Status(response.status()));
		}

		debug!(url = %self.url, "server notified of local change");
		Ok(())
	}
}

#[async_trait]
impl ChangeSink for RemoteNotifier {
	async fn notify_changed(&self) {
		if let Err(e) = self.notify().await {
			warn!(url = %self.url, error = %e, "Failed to notify server of local change");
		}
	}
}
