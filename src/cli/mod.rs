//! CLI command handling for Patty.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{chat, check, config_cmd, lead, serve};

#[derive(Parser)]
#[command(name = "patty")]
#[command(about = "Patty - lead collection assistant for wealth-management advice")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ~/patty/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP chat server (default)
    Serve,
    /// Chat with Patty in the terminal
    Chat,
    /// Show a stored lead
    Lead {
        conversation_id: String,
        /// Also print the conversation transcript
        #[arg(long)]
        history: bool,
    },
    /// Check config, database and resource index
    Check,
    /// Open config in editor
    Config,
}
