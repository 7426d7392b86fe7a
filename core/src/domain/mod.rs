//! Domain types shared by the store, the network surface and the front ends

pub mod item;

pub use item::{InventoryItem, ItemInput, ValidationError, SUGGESTED_CATEGORIES};
