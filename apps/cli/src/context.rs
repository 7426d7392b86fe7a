use anyhow::{Context as _, Result};
use stash_core::{
	AppConfig, ChangeSink, ListenerClient, NullSink, RecordStore, RemoteNotifier,
};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
	Human,
	Json,
}

pub struct Context {
	pub store: Arc<RecordStore>,
	pub config: AppConfig,
	pub format: OutputFormat,
}

impl Context {
	/// Open the local store. With sync enabled, every write is followed by a
	/// notify request to the server so its listeners reload.
	pub async fn open(config: AppConfig, format: OutputFormat) -> Result<Self> {
		let sink: Arc<dyn ChangeSink> = if config.sync.enabled {
			Arc::new(RemoteNotifier::new(config.notify_url())?)
		} else {
			Arc::new(NullSink)
		};

		let store = RecordStore::open(&config.database_path(), sink)
			.await
			.with_context(|| format!("Failed to open {}", config.database_path().display()))?;

		Ok(Self {
			store: Arc::new(store),
			config,
			format,
		})
	}

	pub fn listener(&self) -> ListenerClient {
		ListenerClient::from_config(&self.config)
	}
}
