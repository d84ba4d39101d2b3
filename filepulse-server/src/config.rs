//! Listener configuration for the notification server.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default TCP port of the reference deployment.
pub const DEFAULT_PORT: u16 = 3000;

/// Where the server accepts subscriber connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(PathBuf),
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => write!(f, "tcp://{addr}"),
            ListenAddr::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Full server configuration: one watched path, one listen address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Filesystem resource every subscriber session watches.
    pub watch_path: PathBuf,
    pub listen: ListenAddr,
}

impl ServerConfig {
    pub fn new(watch_path: impl Into<PathBuf>, listen: ListenAddr) -> Self {
        Self {
            watch_path: watch_path.into(),
            listen,
        }
    }
}
