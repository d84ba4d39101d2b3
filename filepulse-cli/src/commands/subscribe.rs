//! `filepulse subscribe` — connect to a server and print notifications.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::Args;
use colored::Colorize;

use filepulse_client::ProtocolClient;
use filepulse_protocol::Message;
use filepulse_server::DEFAULT_PORT;

#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Server host to connect to.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Server TCP port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Connect over a Unix domain socket instead of TCP.
    #[arg(long, conflicts_with_all = ["host", "port"])]
    pub socket: Option<PathBuf>,
}

impl SubscribeArgs {
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build async runtime")?;
        runtime.block_on(self.subscribe())
    }

    async fn subscribe(self) -> Result<()> {
        match self.socket {
            Some(socket) => {
                let stream = tokio::net::UnixStream::connect(&socket)
                    .await
                    .with_context(|| format!("failed to connect to {}", socket.display()))?;
                let (read_half, _write_half) = tokio::io::split(stream);
                ProtocolClient::new(read_half)
                    .for_each(print_message)
                    .await
                    .context("subscription ended with error")
            }
            None => {
                let addr = (self.host, self.port);
                let stream = tokio::net::TcpStream::connect(addr)
                    .await
                    .with_context(|| format!("failed to connect to {}:{}", self.host, self.port))?;
                let (read_half, _write_half) = tokio::io::split(stream);
                ProtocolClient::new(read_half)
                    .for_each(print_message)
                    .await
                    .context("subscription ended with error")
            }
        }
    }
}

fn print_message(message: Message) {
    match message {
        Message::Watching { file } => {
            println!("{} {}", "watching".green().bold(), file);
        }
        Message::Changed { timestamp } => {
            println!(
                "{} {}",
                "changed".yellow().bold(),
                render_timestamp(timestamp)
            );
        }
    }
}

/// Millisecond epoch timestamp as local time; raw number if it does not map
/// to a representable instant.
fn render_timestamp(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|when| when.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
