//! CSV export of the inventory
//!
//! Exports always carry the header row, so an empty inventory still produces
//! a valid (header-only) file. Missing values are written as empty fields.

use crate::config::{AppConfig, ExportConfig};
use crate::domain::InventoryItem;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const CSV_HEADER: [&str; 6] = [
	"id",
	"name",
	"category",
	"purchase_date",
	"serial_number",
	"description",
];

#[derive(Error, Debug)]
pub enum ExportError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// Write `items` to `path`, replacing any existing file. Returns the number
/// of data rows written.
pub fn export_items_csv(items: &[InventoryItem], path: &Path) -> Result<usize> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent)?;
	}

	let mut writer = csv::Writer::from_path(path)?;
	writer.write_record(CSV_HEADER)?;

	for item in items {
		let id = item.id.to_string();
		writer.write_record([
			id.as_str(),
			item.name.as_str(),
			item.category.as_deref().unwrap_or_default(),
			item.purchase_date.as_deref().unwrap_or_default(),
			item.serial_number.as_deref().unwrap_or_default(),
			item.description.as_deref().unwrap_or_default(),
		])?;
	}

	writer.flush()?;
	info!(rows = items.len(), "Exported inventory to {:?}", path);

	Ok(items.len())
}

/// First mounted removable medium, if any.
///
/// Configured mount points count when they are non-empty directories. After
/// that, the first (by name) subdirectory of any mount parent is used.
pub fn detect_removable_mount(config: &ExportConfig) -> Option<PathBuf> {
	for mount in &config.mount_points {
		let populated = fs::read_dir(mount)
			.map(|mut entries| entries.next().is_some())
			.unwrap_or(false);
		if populated {
			debug!("Using mount point {:?}", mount);
			return Some(mount.clone());
		}
	}

	for parent in &config.mount_parents {
		let Ok(entries) = fs::read_dir(parent) else {
			continue;
		};

		let mut mounts: Vec<PathBuf> = entries
			.filter_map(|entry| entry.ok())
			.map(|entry| entry.path())
			.filter(|path| path.is_dir())
			.collect();
		mounts.sort();

		if let Some(mount) = mounts.into_iter().next() {
			debug!("Using removable media at {:?}", mount);
			return Some(mount);
		}
	}

	None
}

/// `inventory_YYYYMMDD_HHMMSS.csv`
pub fn export_file_name(at: NaiveDateTime) -> String {
	format!("inventory_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Where an export requested at `now` should go.
///
/// An explicit destination wins: a directory gets a timestamped file inside
/// it, anything else is taken as the file path. Without one the export goes
/// to removable media when present, else to the exports directory.
pub fn resolve_export_path(dest: Option<&Path>, config: &AppConfig, now: NaiveDateTime) -> PathBuf {
	let file_name = export_file_name(now);

	match dest {
		Some(dest) if dest.is_dir() => dest.join(file_name),
		Some(dest) => dest.to_path_buf(),
		None => detect_removable_mount(&config.export)
			.unwrap_or_else(|| config.exports_dir())
			.join(file_name),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::NaiveDate;
	use pretty_assertions::assert_eq;
	use tempfile::TempDir;

	fn at() -> NaiveDateTime {
		NaiveDate::from_ymd_opt(2024, 1, 10)
			.unwrap()
			.and_hms_opt(9, 5, 3)
			.unwrap()
	}

	fn no_media() -> ExportConfig {
		ExportConfig {
			mount_points: vec![],
			mount_parents: vec![],
		}
	}

	#[test]
	fn writes_header_and_empty_fields() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("nested").join("out.csv");
		let items = vec![
			InventoryItem {
				id: 1,
				name: "Drill".into(),
				category: Some("Narzędzia".into()),
				purchase_date: Some("2024-01-10".into()),
				serial_number: Some("SN1".into()),
				description: Some("cordless, 18V".into()),
			},
			InventoryItem {
				id: 2,
				name: "Chair".into(),
				category: None,
				purchase_date: None,
				serial_number: None,
				description: None,
			},
		];

		assert_eq!(export_items_csv(&items, &path).unwrap(), 2);

		let written = fs::read_to_string(&path).unwrap();
		assert_eq!(
			written,
			"id,name,category,purchase_date,serial_number,description\n\
			 1,Drill,Narzędzia,2024-01-10,SN1,\"cordless, 18V\"\n\
			 2,Chair,,,,\n"
		);
	}

	#[test]
	fn empty_inventory_is_header_only() {
		let dir = TempDir::new().unwrap();
		let path = dir.path().join("out.csv");

		assert_eq!(export_items_csv(&[], &path).unwrap(), 0);
		assert_eq!(
			fs::read_to_string(&path).unwrap(),
			"id,name,category,purchase_date,serial_number,description\n"
		);
	}

	#[test]
	fn file_name_is_timestamped() {
		assert_eq!(export_file_name(at()), "inventory_20240110_090503.csv");
	}

	#[test]
	fn detects_populated_mount_point_before_parents() {
		let dir = TempDir::new().unwrap();
		let empty = dir.path().join("empty");
		let usb = dir.path().join("usb");
		let parent = dir.path().join("media");
		fs::create_dir_all(&empty).unwrap();
		fs::create_dir_all(&usb).unwrap();
		fs::write(usb.join("readme.txt"), "x").unwrap();
		fs::create_dir_all(parent.join("STICK")).unwrap();

		let config = ExportConfig {
			mount_points: vec![empty.clone(), usb.clone()],
			mount_parents: vec![parent],
		};
		assert_eq!(detect_removable_mount(&config), Some(usb));
	}

	#[test]
	fn falls_back_to_first_media_subdirectory() {
		let dir = TempDir::new().unwrap();
		let parent = dir.path().join("media");
		fs::create_dir_all(parent.join("ZETA")).unwrap();
		fs::create_dir_all(parent.join("ALPHA")).unwrap();
		fs::write(parent.join("not-a-mount"), "x").unwrap();

		let config = ExportConfig {
			mount_points: vec![dir.path().join("missing")],
			mount_parents: vec![dir.path().join("also-missing"), parent.clone()],
		};
		assert_eq!(detect_removable_mount(&config), Some(parent.join("ALPHA")));
		assert_eq!(detect_removable_mount(&no_media()), None);
	}

	#[test]
	fn resolves_destination() {
		let dir = TempDir::new().unwrap();
		let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
		config.export = no_media();

		assert_eq!(
			resolve_export_path(None, &config, at()),
			config.exports_dir().join("inventory_20240110_090503.csv")
		);
		assert_eq!(
			resolve_export_path(Some(dir.path()), &config, at()),
			dir.path().join("inventory_20240110_090503.csv")
		);

		let file = dir.path().join("mine.csv");
		assert_eq!(resolve_export_path(Some(&file), &config, at()), file);
	}
}
