//! Filepulse — file-change notification server and subscriber CLI.
//!
//! # Usage
//!
//! ```text
//! filepulse serve <path> [--host <ip>] [--port <u16>] [--socket <path>]
//! filepulse subscribe [--host <ip>] [--port <u16>] [--socket <path>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{serve::ServeArgs, subscribe::SubscribeArgs};

#[derive(Parser, Debug)]
#[command(
    name = "filepulse",
    version,
    about = "Watch a file and broadcast change notifications over line-delimited JSON",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve change notifications for one watched path.
    Serve(ServeArgs),

    /// Subscribe to a running server and print its notifications.
    Subscribe(SubscribeArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(),
        Commands::Subscribe(args) => args.run(),
    }
}
