//! # routerchat
//!
//! Terminal client for Router Chat.
//!
//! ## Commands
//!
//! - `chat`: Interactive session (send lines, watch the board update)
//! - `send`: Send one message
//! - `messages`: Print the message list
//! - `device`: Show what the backend reports about this device
//! - `latest`: Print the most recent message
//!
//! ## Example
//!
//! ```bash
//! # Join the chat on the router at 192.168.1.172
//! routerchat --backend http://192.168.1.172:8080 chat --name Ana
//!
//! # Send one message
//! routerchat send --name Ana "dinner is ready"
//!
//! # Show the conversation
//! routerchat messages
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{chat, device, latest, messages, send};

/// Terminal client for Router Chat.
#[derive(Parser, Debug)]
#[command(name = "routerchat")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (TOML). Defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the config file
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join the chat interactively
    Chat {
        /// Display name
        #[arg(long, short)]
        name: String,
    },

    /// Send one message
    Send {
        /// Display name
        #[arg(long, short)]
        name: String,

        /// Message text
        text: String,
    },

    /// Print the message list
    Messages,

    /// Show device information reported by the backend
    Device,

    /// Print the most recent message
    Latest,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::resolve(cli.config.as_deref(), cli.backend.as_deref())?;

    match cli.command {
        Commands::Chat { name } => chat::run(config, &name).await?,
        Commands::Send { name, text } => send::run(config, &name, &text).await?,
        Commands::Messages => messages::run(config).await?,
        Commands::Device => device::run(config).await?,
        Commands::Latest => latest::run(config).await?,
    }

    Ok(())
}
