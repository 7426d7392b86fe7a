use anyhow::{Context as _, Result};
use chrono::Local;
use clap::Args;
use serde_json::json;
use stash_core::export::{export_items_csv, resolve_export_path};
use std::path::PathBuf;

use crate::context::Context;
use crate::util::prelude::*;

#[derive(Args, Debug)]
pub struct ExportArgs {
	/// Target file or directory. Defaults to removable media when one is
	/// mounted, otherwise the exports directory.
	#[arg(long)]
	pub dest: Option<PathBuf>,
}

pub async fn run(ctx: &Context, args: ExportArgs) -> Result<()> {
	let items = ctx.store.list().await?;
	let path = resolve_export_path(args.dest.as_deref(), &ctx.config, Local::now().naive_local());

	let rows = export_items_csv(&items, &path)
		.with_context(|| format!("Failed to export to {}", path.display()))?;

	print_output!(ctx, &json!({ "path": path, "rows": rows }), |_| {
		println!("Exported {} items to {}", rows, path.display());
	});

	Ok(())
}
