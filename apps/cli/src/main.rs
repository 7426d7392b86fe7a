mod context;
mod domains;
mod ui;
mod util;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use stash_core::config::{default_data_dir, AppConfig};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::context::{Context, OutputFormat};
use crate::domains::{export::ExportArgs, item::ItemCmd};

#[derive(Parser, Debug)]
#[command(name = "stash", about = "Personal inventory tracker", version)]
struct Cli {
	/// Path to the stash data directory
	#[arg(long, global = true)]
	data_dir: Option<PathBuf>,

	/// Output format
	#[arg(long, value_enum, default_value = "human", global = true)]
	format: OutputFormat,

	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	#[command(flatten)]
	Item(ItemCmd),
	/// Export the inventory to CSV
	Export(ExportArgs),
	/// Print a line for every reload broadcast by the server
	Watch,
	/// Interactive terminal UI
	Ui,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	let data_dir = match cli.data_dir {
		Some(dir) => dir,
		None => default_data_dir()?,
	};

	let mut config = AppConfig::load_or_create(&data_dir)?;
	config.apply_env()?;
	config.ensure_directories()?;

	let _log_guard = init_logging(&config);

	match cli.command {
		Commands::Watch => domains::watch::run(&config, cli.format).await,
		Commands::Item(cmd) => domains::item::run(&open(config, cli.format).await?, cmd).await,
		Commands::Export(args) => domains::export::run(&open(config, cli.format).await?, args).await,
		Commands::Ui => ui::run(&open(config, cli.format).await?).await,
	}
}

async fn open(config: AppConfig, format: OutputFormat) -> Result<Context> {
	Context::open(config, format)
		.await
		.context("Failed to open inventory")
}

/// Logs go to a daily file in the data directory so stdout stays clean for
/// command output and the terminal UI.
fn init_logging(config: &AppConfig) -> WorkerGuard {
	let appender = tracing_appender::rolling::daily(config.logs_dir(), "stash.log");
	let (writer, guard) = tracing_appender::non_blocking(appender);

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
			EnvFilter::new(format!("{},stash_core=debug", config.log_level))
		}))
		.with(fmt::layer().with_writer(writer).with_ansi(false))
		.init();

	guard
}
