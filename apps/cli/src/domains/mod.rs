pub mod export;
pub mod item;
pub mod watch;
