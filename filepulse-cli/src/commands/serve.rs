//! `filepulse serve` — run the notification server in the foreground.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use filepulse_server::{start_blocking, ListenAddr, ServerConfig, DEFAULT_PORT};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// File or directory to watch for changes.
    pub path: PathBuf,

    /// TCP bind address.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// TCP port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Listen on a Unix domain socket instead of TCP.
    #[arg(long, conflicts_with_all = ["host", "port"])]
    pub socket: Option<PathBuf>,
}

impl ServeArgs {
    pub fn run(self) -> Result<()> {
        if !self.path.exists() {
            bail!("watch target does not exist: {}", self.path.display());
        }

        let listen = match self.socket {
            Some(socket) => ListenAddr::Unix(socket),
            None => ListenAddr::Tcp(SocketAddr::new(self.host, self.port)),
        };

        start_blocking(ServerConfig::new(self.path, listen)).context("server exited with error")
    }
}
