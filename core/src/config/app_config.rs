//! Application configuration

use super::{default_data_dir, migration::Migrate};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_FILE_NAME: &str = "stash.json";
const DATABASE_FILE_NAME: &str = "inventory.db";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	/// Where the notification server listens (and where clients find it)
	pub server: ServerConfig,

	/// Reload sync between clients
	#[serde(default)]
	pub sync: SyncConfig,

	/// CSV export destinations
	#[serde(default)]
	pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_string(),
			port: 8000,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
	/// Notify the server after local writes and listen for reloads
	pub enabled: bool,
	/// Fixed delay between reconnect attempts
	pub reconnect_delay_secs: u64,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			reconnect_delay_secs: 5,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
	/// Directories that are themselves mount points (e.g. `/mnt/usb`)
	pub mount_points: Vec<PathBuf>,
	/// Directories whose subdirectories are mounted media (e.g. `/media/<user>`)
	pub mount_parents: Vec<PathBuf>,
}

impl Default for ExportConfig {
	fn default() -> Self {
		let user = whoami::username();
		Self {
			mount_points: vec![PathBuf::from("/mnt/usb")],
			mount_parents: vec![
				PathBuf::from("/media").join(&user),
				PathBuf::from("/run/media").join(&user),
			],
		}
	}
}

impl AppConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE_NAME);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)
				.with_context(|| format!("Invalid config at {}", config_path.display()))?;

			if config.needs_migration() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Load or create configuration
	pub fn load_or_create(data_dir: &Path) -> Result<Self> {
		Self::load_from(data_dir).or_else(|e| {
			warn!("Falling back to default config: {:#}", e);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		})
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			server: ServerConfig::default(),
			sync: SyncConfig::default(),
			export: ExportConfig::default(),
		}
	}

	/// Apply `SERVER_HOST` / `SERVER_PORT` from the process environment
	pub fn apply_env(&mut self) -> Result<()> {
		self.apply_env_from(|key| std::env::var(key).ok())
	}

	pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
		if let Some(host) = lookup("SERVER_HOST").filter(|h| !h.trim().is_empty()) {
			self.server.host = host.trim().to_string();
		}

		if let Some(port) = lookup("SERVER_PORT") {
			self.server.port = port
				.trim()
				.parse()
				.map_err(|_| anyhow!("SERVER_PORT is not a valid port: {}", port))?;
		}

		Ok(())
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE_NAME);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn database_path(&self) -> PathBuf {
		self.data_dir.join(DATABASE_FILE_NAME)
	}

	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	pub fn exports_dir(&self) -> PathBuf {
		self.data_dir.join("exports")
	}

	/// Address the server binds to
	pub fn server_addr(&self) -> String {
		format!("{}:{}", self.server.host, self.server.port)
	}

	/// Base HTTP URL clients use to reach the server
	pub fn server_url(&self) -> String {
		format!("http://{}", self.client_host_port())
	}

	pub fn ws_url(&self) -> String {
		format!("ws://{}/ws", self.client_host_port())
	}

	pub fn notify_url(&self) -> String {
		format!("{}/notify_reload", self.server_url())
	}

	pub fn reconnect_delay(&self) -> Duration {
		Duration::from_secs(self.sync.reconnect_delay_secs.max(1))
	}

	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		fs::create_dir_all(self.exports_dir())?;
		Ok(())
	}

	// A server bound to the wildcard address is still reached over loopback.
	fn client_host_port(&self) -> String {
		let host = match self.server.host.as_str() {
			"0.0.0.0" | "" => "127.0.0.1",
			"::" => "[::1]",
			other => other,
		};
		format!("{}:{}", host, self.server.port)
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		1
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				Ok(())
			}
			1 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use tempfile::TempDir;

	#[test]
	fn creates_default_config_on_first_load() {
		let dir = TempDir::new().unwrap();
		let config = AppConfig::load_or_create(dir.path()).unwrap();

		assert_eq!(config.server.host, "127.0.0.1");
		assert_eq!(config.server.port, 8000);
		assert!(config.sync.enabled);
		assert!(dir.path().join(CONFIG_FILE_NAME).exists());
		assert_eq!(config.database_path(), dir.path().join("inventory.db"));
	}

	#[test]
	fn reloads_saved_values() {
		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config.server.port = 9123;
		config.sync.reconnect_delay_secs = 2;
		config.save().unwrap();

		let loaded = AppConfig::load_from(dir.path()).unwrap();
		assert_eq!(loaded.server.port, 9123);
		assert_eq!(loaded.reconnect_delay(), Duration::from_secs(2));
	}

	#[test]
	fn env_overrides_host_and_port() {
		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		let env: HashMap<&str, &str> = [("SERVER_HOST", "0.0.0.0"), ("SERVER_PORT", "8080")]
			.into_iter()
			.collect();

		config
			.apply_env_from(|key| env.get(key).map(|v| v.to_string()))
			.unwrap();

		assert_eq!(config.server_addr(), "0.0.0.0:8080");
		assert_eq!(config.ws_url(), "ws://127.0.0.1:8080/ws");
		assert_eq!(config.notify_url(), "http://127.0.0.1:8080/notify_reload");
	}

	#[test]
	fn rejects_invalid_port() {
		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());

		let result = config.apply_env_from(|key| (key == "SERVER_PORT").then(|| "abc".to_string()));
		assert!(result.is_err());
		assert_eq!(config.server.port, 8000);
	}

	#[test]
	fn migrates_version_zero() {
		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config.version = 0;
		config.save().unwrap();

		let loaded = AppConfig::load_from(dir.path()).unwrap();
		assert_eq!(loaded.version, AppConfig::target_version());
	}
}
