//! Stash core
//!
//! Personal inventory records in a local SQLite database, plus the plumbing
//! that keeps several front ends over the same database in step: every
//! committed write ends in a `reload` event pushed to connected listeners.

pub mod api;
pub mod config;
pub mod domain;
pub mod export;
pub mod infrastructure;
pub mod listener;
pub mod notifier;
pub mod store;

pub use config::AppConfig;
pub use domain::{InventoryItem, ItemInput, ValidationError};
pub use listener::{ListenerClient, ListenerHandle, ListenerState};
pub use notifier::{ChangeNotifier, ChangeSink, NotifyEvent, NullSink, RemoteNotifier};
pub use store::{ItemQuery, RecordStore, SortKey, StoreError};
