use anyhow::{bail, Result};
use dialoguer::Confirm;

/// Ask for a yes/no confirmation unless `assume_yes` is set; bail on "no"
pub fn confirm_or_abort(prompt: &str, assume_yes: bool) -> Result<()> {
	if assume_yes {
		return Ok(());
	}

	let confirmed = Confirm::new()
		.with_prompt(prompt)
		.default(false)
		.interact()?;

	if !confirmed {
		bail!("Operation cancelled");
	}

	Ok(())
}
