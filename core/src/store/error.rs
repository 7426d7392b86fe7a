//! Record store error types

use crate::domain::ValidationError;
use thiserror::Error;

/// Record store operation errors
#[derive(Error, Debug)]
pub enum StoreError {
	/// The input was rejected before anything was written
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// The database could not be read or written
	#[error("Database error: {0}")]
	Storage(#[from] sea_orm::DbErr),
}

impl StoreError {
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation(_))
	}
}

/// Result type for record store operations
pub type Result<T> = std::result::Result<T, StoreError>;
