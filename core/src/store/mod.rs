//! Inventory record store
//!
//! All reads and writes of inventory records go through [`RecordStore`].
//! Every mutation is a single statement that commits on its own; once it has
//! committed the store tells its [`ChangeSink`] so that other clients can
//! reload. The sink never influences the outcome of the write.

pub mod error;
pub mod query;

use crate::domain::{InventoryItem, ItemInput};
use crate::infrastructure::database::{
	entities::{inventory_item, InventoryItem as ItemEntity, InventoryItemActive},
	Database,
};
use crate::notifier::ChangeSink;
use sea_orm::sea_query::{Expr, NullOrdering, Order};
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub use error::{Result, StoreError};
pub use query::{ItemQuery, SortKey};

pub struct RecordStore {
	db: Database,
	sink: Arc<dyn ChangeSink>,
}

impl RecordStore {
	/// Open (creating if needed) the store at `path` and bring its schema up to date
	pub async fn open(path: &Path, sink: Arc<dyn ChangeSink>) -> Result<Self> {
		let db = Database::open(path).await?;
		db.migrate().await?;

		info!("Record store ready at {:?}", path);

		Ok(Self { db, sink })
	}

	/// All records, ascending by id
	pub async fn list(&self) -> Result<Vec<InventoryItem>> {
		let models = ItemEntity::find()
			.order_by_asc(inventory_item::Column::Id)
			.all(self.db.conn())
			.await?;

		Ok(models.into_iter().map(Into::into).collect())
	}

	pub async fn get(&self, id: i32) -> Result<Option<InventoryItem>> {
		let model = ItemEntity::find_by_id(id).one(self.db.conn()).await?;
		Ok(model.map(Into::into))
	}

	/// Records matching `query`. Missing values sort last in either direction;
	/// ties fall back to ascending id.
	///
	/// The search term is matched here rather than with `LIKE`, which treats
	/// `%` and `_` as wildcards and only folds ASCII case.
	pub async fn query(&self, query: &ItemQuery) -> Result<Vec<InventoryItem>> {
		use inventory_item::Column;

		let mut select = ItemEntity::find();

		let categories = query.category_filters();
		if !categories.is_empty() {
			select = select.filter(Column::Category.is_in(categories));
		}

		let order = if query.descending {
			Order::Desc
		} else {
			Order::Asc
		};

		select = match query.sort {
			SortKey::Id => select.order_by(Column::Id, order),
			SortKey::Name => select.order_by(Column::Name, order),
			SortKey::Category => {
				select.order_by_with_nulls(Column::Category, order, NullOrdering::Last)
			}
			SortKey::PurchaseDate => {
				select.order_by_with_nulls(Column::PurchaseDate, order, NullOrdering::Last)
			}
		};

		if query.sort != SortKey::Id {
			select = select.order_by_asc(Column::Id);
		}

		let models = select.all(self.db.conn()).await?;
		let mut items: Vec<InventoryItem> = models.into_iter().map(Into::into).collect();

		if let Some(term) = query.search_term() {
			let needle = term.to_lowercase();
			items.retain(|item| item.mentions(&needle));
		}

		Ok(items)
	}

	/// Distinct categories in use, sorted
	pub async fn categories(&self) -> Result<Vec<String>> {
		use inventory_item::Column;

		let categories: Vec<Option<String>> = ItemEntity::find()
			.select_only()
			.column(Column::Category)
			.distinct()
			.filter(Column::Category.is_not_null())
			.order_by_asc(Column::Category)
			.into_tuple()
			.all(self.db.conn())
			.await?;

		Ok(categories.into_iter().flatten().collect())
	}

	/// Insert a new record and return its id
	pub async fn add(&self, input: ItemInput) -> Result<i32> {
		let input = input.validated()?;

		let model = InventoryItemActive {
			name: Set(input.name),
			category: Set(input.category),
			purchase_date: Set(input.purchase_date),
			serial_number: Set(input.serial_number),
			description: Set(input.description),
			..Default::default()
		};

		let id = ItemEntity::insert(model)
			.exec(self.db.conn())
			.await?
			.last_insert_id;

		debug!(id, "Inventory item added");
		self.sink.notify_changed().await;

		Ok(id)
	}

	/// Replace every field of record `id`. A missing id is not an error.
	pub async fn update(&self, id: i32, input: ItemInput) -> Result<()> {
		use inventory_item::Column;

		let input = input.validated()?;

		let result = ItemEntity::update_many()
			.col_expr(Column::Name, Expr::value(input.name))
			.col_expr(Column::Category, Expr::value(input.category))
			.col_expr(Column::PurchaseDate, Expr::value(input.purchase_date))
			.col_expr(Column::SerialNumber, Expr::value(input.serial_number))
			.col_expr(Column::Description, Expr::value(input.description))
			.filter(Column::Id.eq(id))
			.exec(self.db.conn())
			.await?;

		debug!(id, rows = result.rows_affected, "Inventory item updated");
		self.sink.notify_changed().await;

		Ok(())
	}

	/// Permanently remove record `id`. A missing id is not an error.
	pub async fn delete(&self, id: i32) -> Result<()> {
		let result = ItemEntity::delete_by_id(id).exec(self.db.conn()).await?;

		debug!(id, rows = result.rows_affected, "Inventory item deleted");
		self.sink.notify_changed().await;

		Ok(())
	}
}
