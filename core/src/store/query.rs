//! Search, filter and sort options for listing records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	#[default]
	Id,
	Name,
	Category,
	PurchaseDate,
}

impl SortKey {
	pub const ALL: [SortKey; 4] = [Self::Id, Self::Name, Self::Category, Self::PurchaseDate];

	/// The key after this one, wrapping around
	pub fn next(self) -> Self {
		match self {
			Self::Id => Self::Name,
			Self::Name => Self::Category,
			Self::Category => Self::PurchaseDate,
			Self::PurchaseDate => Self::Id,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Self::Id => "id",
			Self::Name => "name",
			Self::Category => "category",
			Self::PurchaseDate => "date",
		}
	}
}

impl fmt::Display for SortKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.label())
	}
}

impl FromStr for SortKey {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"id" => Ok(Self::Id),
			"name" => Ok(Self::Name),
			"category" => Ok(Self::Category),
			"date" | "purchase_date" => Ok(Self::PurchaseDate),
			other => Err(format!("unknown sort key '{other}'")),
		}
	}
}

/// Listing options. The default lists everything by ascending id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemQuery {
	/// Case-insensitive literal substring of name, serial number or description
	pub search: Option<String>,
	/// Records in any of these categories. Empty means every record.
	pub categories: Vec<String>,
	pub sort: SortKey,
	pub descending: bool,
}

impl ItemQuery {
	pub fn search(mut self, term: impl Into<String>) -> Self {
		self.search = Some(term.into());
		self
	}

	/// Also accept records in `category`
	pub fn category(mut self, category: impl Into<String>) -> Self {
		let category = category.into();
		if !self.categories.contains(&category) {
			self.categories.push(category);
		}
		self
	}

	/// Add `category` to the filter, or remove it when already present.
	/// Returns whether the category is now part of the filter.
	pub fn toggle_category(&mut self, category: &str) -> bool {
		match self.categories.iter().position(|c| c == category) {
			Some(i) => {
				self.categories.remove(i);
				false
			}
			None => {
				self.categories.push(category.to_string());
				true
			}
		}
	}

	pub fn sort_by(mut self, sort: SortKey, descending: bool) -> Self {
		self.sort = sort;
		self.descending = descending;
		self
	}

	pub(crate) fn search_term(&self) -> Option<&str> {
		self.search
			.as_deref()
			.map(str::trim)
			.filter(|term| !term.is_empty())
	}

	pub(crate) fn category_filters(&self) -> Vec<&str> {
		self.categories
			.iter()
			.map(|category| category.trim())
			.filter(|category| !category.is_empty())
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sort_keys_cycle_through_all() {
		let mut key = SortKey::default();
		for expected in SortKey::ALL.iter().skip(1) {
			key = key.next();
			assert_eq!(key, *expected);
		}
		assert_eq!(key.next(), SortKey::Id);
	}

	#[test]
	fn sort_key_parses_labels() {
		for key in SortKey::ALL {
			assert_eq!(key.label().parse::<SortKey>(), Ok(key));
		}
		assert!("price".parse::<SortKey>().is_err());
	}

	#[test]
	fn blank_filters_are_ignored() {
		let query = ItemQuery::default().search("  ").category("");
		assert_eq!(query.search_term(), None);
		assert!(query.category_filters().is_empty());
	}

	#[test]
	fn categories_toggle_in_and_out() {
		let mut query = ItemQuery::default().category("IT").category("IT");
		assert_eq!(query.categories, vec!["IT".to_string()]);

		assert!(query.toggle_category("Meble"));
		assert_eq!(query.category_filters(), vec!["IT", "Meble"]);

		assert!(!query.toggle_category("IT"));
		assert_eq!(query.category_filters(), vec!["Meble"]);
	}
}
