use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use stash_core::{
	api::{self, ApiState},
	config::{default_data_dir, AppConfig},
	ChangeNotifier, RecordStore,
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Inventory server: REST endpoints plus reload notifications over `/ws`
#[derive(Parser, Debug)]
#[command(name = "stash-server", version)]
struct Args {
	/// Path to the stash data directory
	#[arg(long)]
	data_dir: Option<PathBuf>,

	/// Address to bind (overrides config and SERVER_HOST)
	#[arg(long)]
	host: Option<String>,

	/// Port to bind (overrides config and SERVER_PORT)
	#[arg(long)]
	port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let data_dir = match args.data_dir {
		Some(dir) => dir,
		None => default_data_dir()?,
	};

	let mut config = AppConfig::load_or_create(&data_dir)?;
	config.apply_env()?;
	if let Some(host) = args.host {
		config.server.host = host;
	}
	if let Some(port) = args.port {
		config.server.port = port;
	}
	config.ensure_directories()?;

	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| {
				EnvFilter::new(format!("{},stash_core=debug", config.log_level))
			}),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let notifier = ChangeNotifier::new();
	let store = RecordStore::open(&config.database_path(), Arc::new(notifier.clone()))
		.await
		.context("Failed to open record store")?;

	let state = ApiState {
		store: Arc::new(store),
		notifier: notifier.clone(),
		export_path: config.data_dir.join("export.csv"),
	};

	let addr = config.server_addr();
	let listener = TcpListener::bind(&addr)
		.await
		.with_context(|| format!("Failed to bind {}", addr))?;

	api::serve(listener, state, async move {
		shutdown_signal().await;
		notifier.close_all();
	})
	.await
	.context("HTTP server failed")?;

	info!("Server stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to install Ctrl+C handler: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
		() = terminate => info!("Received SIGTERM, shutting down gracefully..."),
	}
}
