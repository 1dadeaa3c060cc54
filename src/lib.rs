pub mod clipboard;
pub mod db;
pub mod error;
pub mod export;
pub mod filter;
pub mod logging;
pub mod model;
pub mod ops;
pub mod output;
pub mod selection;
pub mod settings;
pub mod state;
pub mod store;
pub mod tui;
pub mod validate;
pub mod watch;
