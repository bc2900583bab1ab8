mod catalog;
mod cli;
mod config;
mod context;
mod conversation;
mod extraction;
mod index;
mod lead;
mod llm;
mod questions;
mod recommend;
mod server;
mod service;
mod store;
#[cfg(test)]
mod testing;
mod ui;
mod validator;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, None | Some(Command::Serve)));

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr when `RUST_LOG` is set. The server always logs, at `info` by default.
fn init_tracing(serving: bool) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) if serving => EnvFilter::new("info"),
        Err(_) => return,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Command::Check) => Ok(cli::check(config_path)),
        Some(Command::Config) => {
            cli::config_cmd(config_path)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Chat) => {
            cli::chat(&Config::load(config_path)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Lead {
            conversation_id,
            history,
        }) => cli::lead(&Config::load(config_path)?, &conversation_id, history),
        Some(Command::Serve) | None => {
            cli::serve(&Config::load(config_path)?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
