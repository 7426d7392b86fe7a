mod args;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use comfy_table::{presets::UTF8_BORDERS_ONLY, Table};
use serde_json::json;
use stash_core::InventoryItem;

use crate::context::Context;
use crate::util::prelude::*;

use self::args::*;

#[derive(Subcommand, Debug)]
pub enum ItemCmd {
	/// List inventory items
	List(ItemListArgs),
	/// Add an item
	Add(ItemAddArgs),
	/// Change fields of an item
	Edit(ItemEditArgs),
	/// Delete one or more items
	Delete(ItemDeleteArgs),
}

pub async fn run(ctx: &Context, cmd: ItemCmd) -> Result<()> {
	match cmd {
		ItemCmd::List(args) => {
			let items = ctx.store.query(&args.into()).await?;
			print_output!(ctx, &items, |items: &Vec<InventoryItem>| {
				if items.is_empty() {
					println!("No items found");
					return;
				}
				println!("{}", item_table(items));
			});
		}
		ItemCmd::Add(args) => {
			let id = ctx.store.add(args.into()).await?;
			print_output!(ctx, &json!({ "id": id }), |_| {
				println!("Added item {}", id);
			});
		}
		ItemCmd::Edit(args) => {
			let id = args.id;
			let current = ctx
				.store
				.get(id)
				.await?
				.ok_or_else(|| anyhow!("Item {} not found", id))?;

			ctx.store.update(id, args.apply_to(&current)).await?;

			let updated = ctx.store.get(id).await?;
			print_output!(ctx, &updated, |_| {
				println!("Updated item {}", id);
			});
		}
		ItemCmd::Delete(args) => {
			let label = match args.ids.as_slice() {
				[id] => match ctx.store.get(*id).await? {
					Some(item) => format!("item {} ({})", item.id, item.name),
					None => format!("item {}", id),
				},
				ids => format!("{} items", ids.len()),
			};
			confirm_or_abort(&format!("Delete {}?", label), args.yes)?;

			for id in &args.ids {
				ctx.store.delete(*id).await?;
			}
			print_output!(ctx, &json!({ "deleted": args.ids }), |_| {
				println!("Deleted {}", label);
			});
		}
	}

	Ok(())
}

fn item_table(items: &[InventoryItem]) -> Table {
	let mut table = Table::new();
	table.load_preset(UTF8_BORDERS_ONLY);
	table.set_header(vec![
		"ID",
		"Name",
		"Category",
		"Purchased",
		"Serial",
		"Description",
	]);

	for item in items {
		table.add_row(vec![
			item.id.to_string(),
			item.name.clone(),
			item.category.clone().unwrap_or_default(),
			item.purchase_date.clone().unwrap_or_default(),
			item.serial_number.clone().unwrap_or_default(),
			item.description.clone().unwrap_or_default(),
		]);
	}

	table
}
