use anyhow::Result;
use chrono::Local;
use serde_json::json;

use stash_core::{AppConfig, ListenerClient};

use crate::context::OutputFormat;

/// Follow the server's reload stream until Ctrl+C. Needs no local store.
pub async fn run(config: &AppConfig, format: OutputFormat) -> Result<()> {
	let listener = ListenerClient::from_config(config);
	if let OutputFormat::Human = format {
		eprintln!("Watching {} (Ctrl+C to stop)", listener.url());
	}

	let (handle, mut reloads) = listener.start_channel();

	loop {
		tokio::select! {
			reload = reloads.recv() => {
				if reload.is_none() {
					break;
				}
				let at = Local::now().format("%Y-%m-%d %H:%M:%S");
				match format {
					OutputFormat::Human => println!("{} reload", at),
					OutputFormat::Json => println!(
						"{}",
						json!({ "at": at.to_string(), "event": "reload" })
					),
				}
			}
			_ = tokio::signal::ctrl_c() => break,
		}
	}

	handle.shutdown().await;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;
	use tempfile::TempDir;

	#[tokio::test]
	async fn watching_leaves_the_database_untouched() {
		let dir = TempDir::new().unwrap();
		let config = AppConfig::load_or_create(dir.path()).unwrap();
		config.ensure_directories().unwrap();

		// Runs until Ctrl+C, so the timeout always fires.
		let watched =
			tokio::time::timeout(Duration::from_millis(200), run(&config, OutputFormat::Json)).await;
		assert!(watched.is_err());

		assert!(!config.database_path().exists());
	}
}
