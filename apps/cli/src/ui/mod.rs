//! Interactive terminal UI

mod app;
mod tui;

pub use tui::run;
