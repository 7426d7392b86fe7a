use clap::Args;
use stash_core::{InventoryItem, ItemInput, ItemQuery, SortKey};

#[derive(Args, Debug)]
pub struct ItemListArgs {
	/// Substring to look for in name, serial number and description
	#[arg(long, short = 's')]
	pub search: Option<String>,
	/// Only show items in these categories (repeatable)
	#[arg(long = "category", short = 'c')]
	pub categories: Vec<String>,
	/// Sort column (id, name, category, date)
	#[arg(long, default_value_t = SortKey::Id)]
	pub sort: SortKey,
	/// Sort descending
	#[arg(long, default_value_t = false)]
	pub desc: bool,
}

impl From<ItemListArgs> for ItemQuery {
	fn from(args: ItemListArgs) -> Self {
		Self {
			search: args.search,
			categories: args.categories,
			sort: args.sort,
			descending: args.desc,
		}
	}
}

#[derive(Args, Debug)]
pub struct ItemAddArgs {
	pub name: String,
	#[arg(long)]
	pub category: Option<String>,
	/// YYYY-MM-DD
	#[arg(long)]
	pub purchase_date: Option<String>,
	#[arg(long)]
	pub serial_number: Option<String>,
	#[arg(long)]
	pub description: Option<String>,
}

impl From<ItemAddArgs> for ItemInput {
	fn from(args: ItemAddArgs) -> Self {
		Self {
			name: args.name,
			category: args.category,
			purchase_date: args.purchase_date,
			serial_number: args.serial_number,
			description: args.description,
		}
	}
}

/// Fields left out keep their current value; pass an empty string to clear one.
#[derive(Args, Debug)]
pub struct ItemEditArgs {
	pub id: i32,
	#[arg(long)]
	pub name: Option<String>,
	#[arg(long)]
	pub category: Option<String>,
	#[arg(long)]
	pub purchase_date: Option<String>,
	#[arg(long)]
	pub serial_number: Option<String>,
	#[arg(long)]
	pub description: Option<String>,
}

impl ItemEditArgs {
	pub fn apply_to(self, current: &InventoryItem) -> ItemInput {
		let mut input = ItemInput::from(current);

		if let Some(name) = self.name {
			input.name = name;
		}
		if let Some(category) = self.category {
			input.category = Some(category);
		}
		if let Some(date) = self.purchase_date {
			input.purchase_date = Some(date);
		}
		if let Some(serial) = self.serial_number {
			input.serial_number = Some(serial);
		}
		if let Some(description) = self.description {
			input.description = Some(description);
		}

		input
	}
}

#[derive(Args, Debug)]
pub struct ItemDeleteArgs {
	/// One or more ids, confirmed once for all of them
	#[arg(required = true)]
	pub ids: Vec<i32>,
	#[arg(long, short = 'y', default_value_t = false)]
	pub yes: bool,
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::Parser;
	use pretty_assertions::assert_eq;

	#[derive(Parser)]
	struct ListCli {
		#[command(flatten)]
		args: ItemListArgs,
	}

	#[derive(Parser)]
	struct DeleteCli {
		#[command(flatten)]
		args: ItemDeleteArgs,
	}

	#[test]
	fn list_accepts_several_categories() {
		let cli = ListCli::parse_from(["list", "-c", "IT", "--category", "Meble", "--sort", "date"]);
		let query = ItemQuery::from(cli.args);

		assert_eq!(query.categories, vec!["IT".to_string(), "Meble".to_string()]);
		assert_eq!(query.sort, SortKey::PurchaseDate);
	}

	#[test]
	fn delete_takes_one_or_more_ids() {
		let cli = DeleteCli::parse_from(["delete", "-y", "3", "7"]);
		assert_eq!(cli.args.ids, vec![3, 7]);
		assert!(cli.args.yes);

		assert!(DeleteCli::try_parse_from(["delete"]).is_err());
	}

	fn drill() -> InventoryItem {
		InventoryItem {
			id: 3,
			name: "Drill".into(),
			category: Some("Narzędzia".into()),
			purchase_date: Some("2024-01-10".into()),
			serial_number: Some("SN1".into()),
			description: Some("cordless".into()),
		}
	}

	#[test]
	fn edit_keeps_unset_fields_and_clears_empty_ones() {
		let args = ItemEditArgs {
			id: 3,
			name: None,
			category: Some("IT".into()),
			purchase_date: None,
			serial_number: None,
			description: Some(String::new()),
		};

		let input = args.apply_to(&drill()).normalized();
		assert_eq!(
			input,
			ItemInput::new("Drill")
				.category("IT")
				.purchase_date("2024-01-10")
				.serial_number("SN1")
		);
	}
}
