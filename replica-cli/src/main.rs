//! # kvreplica
//!
//! CLI tool for inspecting kvreplica servers.
//!
//! ## Commands
//!
//! - `fetch`: Fetch once and print the response as JSON
//! - `poll`: Track keys and print every change as it arrives
//!
//! ## Example
//!
//! ```bash
//! # Everything the server holds
//! kvreplica fetch --addr 127.0.0.1:8086
//!
//! # Only entries newer than the given versions
//! kvreplica fetch --addr 127.0.0.1:8086 --key motd=3 --key limits
//!
//! # Watch a key, checking every 2 seconds
//! kvreplica poll --addr 127.0.0.1:8086 --key motd --interval 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod json;

use commands::{fetch, poll, KeyArg};

/// CLI tool for inspecting kvreplica servers.
#[derive(Parser, Debug)]
#[command(name = "kvreplica")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server address (host:port)
    #[arg(long, short, global = true, default_value = "127.0.0.1:8086")]
    addr: String,

    /// Round-trip deadline in seconds (0 = wait indefinitely)
    #[arg(long, global = true, default_value = "5")]
    timeout: u64,

    /// Custom type name to accept in responses (repeatable)
    #[arg(long = "accept-type", global = true)]
    accept_types: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch once and print the response as JSON
    Fetch {
        /// Key to request, optionally with the version already held (NAME[=VERSION])
        #[arg(long, short)]
        key: Vec<KeyArg>,
    },

    /// Track keys and print every change
    Poll {
        /// Key to track, optionally starting from a version (NAME[=VERSION])
        #[arg(long, short)]
        key: Vec<KeyArg>,

        /// Seconds between fetches
        #[arg(long, short, default_value = "5")]
        interval: u64,

        /// Stop after this many fetches (default: run until interrupted)
        #[arg(long, short)]
        count: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = commands::Target {
        addr: cli.addr,
        timeout_secs: cli.timeout,
        accept_types: cli.accept_types,
    };

    match cli.command {
        Commands::Fetch { key } => {
            fetch::run(&target, &key).await?;
        }
        Commands::Poll {
            key,
            interval,
            count,
        } => {
            poll::run(&target, &key, interval, count).await?;
        }
    }

    Ok(())
}
