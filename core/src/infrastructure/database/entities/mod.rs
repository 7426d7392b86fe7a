//! Sea-ORM entity definitions

pub mod inventory_item;

pub use inventory_item::ActiveModel as InventoryItemActive;
pub use inventory_item::Entity as InventoryItem;
