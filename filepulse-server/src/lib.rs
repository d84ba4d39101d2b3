//! Notification server runtime: per-subscriber file watchers + LDJ fan-out.

mod error;
mod session;

pub mod config;
pub mod server;
pub mod watcher;

pub use config::{ListenAddr, ServerConfig, DEFAULT_PORT};
pub use error::ServerError;
pub use server::{start_blocking, NotificationServer};
pub use watcher::{FileWatcher, WatchEvent};
