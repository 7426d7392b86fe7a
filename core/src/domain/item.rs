//! Inventory item domain model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category suggestions offered by the front end. Not enforced.
pub const SUGGESTED_CATEGORIES: &[&str] = &[
	"Narzędzia",
	"IT",
	"Oprogramowanie",
	"Wyposażenie biurowe",
	"Transport",
	"BHP",
	"Meble",
	"Inne",
];

pub const PURCHASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A persisted inventory record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
	pub id: i32,
	pub name: String,
	pub category: Option<String>,
	pub purchase_date: Option<String>,
	pub serial_number: Option<String>,
	pub description: Option<String>,
}

impl InventoryItem {
	/// Whether name, serial number or description contains `needle`, which
	/// must already be lowercase.
	pub fn mentions(&self, needle: &str) -> bool {
		[
			Some(&self.name),
			self.serial_number.as_ref(),
			self.description.as_ref(),
		]
		.into_iter()
		.flatten()
		.any(|field| field.to_lowercase().contains(needle))
	}
}

/// Everything about a record except its id. Used for both add and update.
///
/// An `id` field in incoming JSON is accepted and ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
	pub name: String,
	#[serde(default)]
	pub category: Option<String>,
	#[serde(default)]
	pub purchase_date: Option<String>,
	#[serde(default)]
	pub serial_number: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
	#[error("Name is required")]
	EmptyName,

	#[error("Purchase date '{0}' is not a valid YYYY-MM-DD date")]
	InvalidPurchaseDate(String),
}

impl ItemInput {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Default::default()
		}
	}

	pub fn category(mut self, category: impl Into<String>) -> Self {
		self.category = Some(category.into());
		self
	}

	pub fn purchase_date(mut self, date: impl Into<String>) -> Self {
		self.purchase_date = Some(date.into());
		self
	}

	pub fn serial_number(mut self, serial: impl Into<String>) -> Self {
		self.serial_number = Some(serial.into());
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Trim every field and turn blank optional fields into `None`.
	pub fn normalized(self) -> Self {
		Self {
			name: self.name.trim().to_string(),
			category: non_blank(self.category),
			purchase_date: non_blank(self.purchase_date),
			serial_number: non_blank(self.serial_number),
			description: non_blank(self.description),
		}
	}

	/// Normalise, then check the fields the store cannot accept.
	pub fn validated(self) -> Result<Self, ValidationError> {
		let input = self.normalized();

		if input.name.is_empty() {
			return Err(ValidationError::EmptyName);
		}

		if let Some(date) = &input.purchase_date {
			NaiveDate::parse_from_str(date, PURCHASE_DATE_FORMAT)
				.map_err(|_| ValidationError::InvalidPurchaseDate(date.clone()))?;
		}

		Ok(input)
	}
}

impl From<&InventoryItem> for ItemInput {
	fn from(item: &InventoryItem) -> Self {
		Self {
			name: item.name.clone(),
			category: item.category.clone(),
			purchase_date: item.purchase_date.clone(),
			serial_number: item.serial_number.clone(),
			description: item.description.clone(),
		}
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}
