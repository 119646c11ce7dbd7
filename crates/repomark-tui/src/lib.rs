// Terminal UI implementation using ratatui
// Search GitHub, bookmark what you find, annotate and chart it

pub mod app;
pub mod runner;
pub mod ui;

pub use app::{App, AppEvent, Command, InputMode, Pane, SearchPhase};
pub use runner::{handle_key, run_tui, Services};
