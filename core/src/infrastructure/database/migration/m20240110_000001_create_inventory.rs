//! Create the inventory table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		// AUTOINCREMENT on SQLite keeps deleted ids from being handed out again
		manager
			.create_table(
				Table::create()
					.table(Inventory::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Inventory::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Inventory::Name).text().not_null())
					.col(ColumnDef::new(Inventory::Category).text())
					.col(ColumnDef::new(Inventory::PurchaseDate).text())
					.col(ColumnDef::new(Inventory::SerialNumber).text())
					.col(ColumnDef::new(Inventory::Description).text())
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_inventory_category")
					.table(Inventory::Table)
					.col(Inventory::Category)
					.if_not_exists()
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(Inventory::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
enum Inventory {
	Table,
	Id,
	Name,
	Category,
	PurchaseDate,
	SerialNumber,
	Description,
}
