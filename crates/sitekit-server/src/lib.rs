//! Development server with live reload for sitekit.
//!
//! Serves the source tree over HTTP, watches it for changes and pushes
//! reload notifications to connected browsers over a WebSocket.

pub mod reload;
pub mod server;
pub mod watcher;

pub use reload::{ReloadHub, ReloadMessage};
pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchError, WatchTopic, DEBOUNCE};
