//! Command-line interface for the arena server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arena - tic-tac-toe games with per-game chat sessions
#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(about = "Tic-tac-toe game server with real-time chat", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP and WebSocket server
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the resolved configuration as TOML
    Config {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
