pub mod action;
pub mod api;
#[cfg(feature = "tui")]
pub mod app;
pub mod args;
pub mod commands;
pub mod config;
#[cfg(feature = "tui")]
pub mod dialogs;
pub mod error;
pub mod logging;
#[cfg(feature = "tui")]
pub mod pages;
pub mod panel;
#[cfg(feature = "tui")]
pub mod panes;
pub mod providers;
pub mod theme;
#[cfg(feature = "tui")]
pub mod tui;

pub use api::{HttpBackend, SettingsBackend};
pub use panel::{PanelEvent, PanelOptions, SettingsPanel};
