pub mod calendar;
pub mod commands;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod remote;
pub mod retention;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tui;
pub mod watcher;

pub use error::{Error, Result};
pub use session::Session;
