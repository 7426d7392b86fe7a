//! Versioned config upgrades

use anyhow::Result;

/// Implemented by persisted configs that carry a schema version.
pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32
	where
		Self: Sized;

	/// Bring `self` up to [`Migrate::target_version`].
	fn migrate(&mut self) -> Result<()>;

	fn needs_migration(&self) -> bool
	where
		Self: Sized,
	{
		self.current_version() < Self::target_version()
	}
}
