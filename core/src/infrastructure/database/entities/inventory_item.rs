//! Inventory item entity

use crate::domain;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub name: String,
	pub category: Option<String>,
	pub purchase_date: Option<String>,
	pub serial_number: Option<String>,
	pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for domain::InventoryItem {
	fn from(model: Model) -> Self {
		Self {
			id: model.id,
			name: model.name,
			category: model.category,
			purchase_date: model.purchase_date,
			serial_number: model.serial_number,
			description: model.description,
		}
	}
}
