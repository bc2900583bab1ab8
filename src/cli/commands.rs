//! CLI commands.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;

use crate::config::{self, Config};
use crate::context::AppContext;
use crate::index::DocumentIndex;
use crate::lead::{Field, Lead};
use crate::server;
use crate::service::{ChatService, ChatStatus};
use crate::store::{LeadStore, SqliteLeadStore};
use crate::ui::{self, StatusLine, Table, TypingSpinner};
use crate::validator::format_phone;

/// Run the HTTP server until Ctrl-C.
pub fn serve(config: &Config) -> Result<()> {
    // The model client is blocking, so collaborators are built before the runtime.
    let service = Arc::new(ChatService::new(AppContext::from_config(config)?));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(server::run(
        Arc::clone(&service),
        &config.server.bind,
        &config.server.allowed_origins,
    ))?;
    drop(runtime);

    drop(service);
    Ok(())
}

/// Interactive conversation in the terminal.
pub fn chat(config: &Config) -> Result<()> {
    let service = ChatService::new(AppContext::from_config(config)?);

    let opening = service.start();
    let conversation_id = opening.conversation_id;
    println!();
    print_reply(&opening.content);

    loop {
        let input: String = Input::new()
            .with_prompt(format!("{}", style("Vous").bold()))
            .allow_empty(true)
            .interact_text()?;
        let input = input.trim();
        if input.is_empty() || input == "/quit" {
            break;
        }

        let spinner = TypingSpinner::new("Patty écrit");
        let response = service.submit(&conversation_id, input);
        spinner.finish();
        print_reply(&response.content);

        if response.status == ChatStatus::Finished {
            break;
        }
    }

    ui::status::hint(&format!("Conversation {conversation_id}"));
    println!();
    Ok(())
}

fn print_reply(content: &str) {
    println!("{}", style("Patty").cyan().bold());
    for line in content.lines() {
        println!("  {line}");
    }
    println!();
}

/// Print a stored lead.
pub fn lead(config: &Config, conversation_id: &str, history: bool) -> Result<ExitCode> {
    let store = SqliteLeadStore::open(&config.storage.database)?;

    let Some(lead) = store.get(conversation_id)? else {
        ui::status::print_error(
            &format!("No lead for conversation {conversation_id}"),
            Some("Conversation ids are printed at the end of `patty chat`."),
        );
        return Ok(ExitCode::FAILURE);
    };

    println!();
    let mut table = Table::new(&["Field", "Value"]);
    for (key, value) in lead_rows(&lead) {
        table.add_row(&[key, &value]);
    }
    table.print();

    if history {
        println!();
        println!("{}", style("Transcript").bold());
        for entry in &lead.conversation_history {
            println!(
                "  {} {:<9} {}",
                style(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).dim(),
                format!("{:?}", entry.role).to_lowercase(),
                entry.content.replace('\n', "\n            ")
            );
        }
    }

    println!();
    Ok(ExitCode::SUCCESS)
}

/// One `(label, value)` pair per lead attribute, in asking order.
fn lead_rows(lead: &Lead) -> Vec<(&'static str, String)> {
    let text = |value: Option<&str>| value.unwrap_or(ui::MISSING).to_string();

    let mut rows: Vec<(&'static str, String)> = Field::REQUIRED
        .into_iter()
        .map(|field| {
            let value = match field {
                Field::LastName => text(lead.last_name.as_deref()),
                Field::FirstName => text(lead.first_name.as_deref()),
                Field::Email => text(lead.email.as_deref()),
                Field::Phone => lead
                    .phone
                    .as_deref()
                    .map_or_else(|| ui::MISSING.to_string(), format_phone),
                Field::Age => lead
                    .age
                    .map_or_else(|| ui::MISSING.to_string(), |age| age.to_string()),
                Field::MaritalStatus => text(lead.marital_status.as_deref()),
                Field::Profession => text(lead.profession.as_deref()),
                Field::Income => text(lead.income.as_deref()),
                Field::Wealth => text(lead.wealth.as_deref()),
                Field::Goals => lead
                    .goals
                    .as_ref()
                    .map_or_else(|| ui::MISSING.to_string(), |goals| goals.join(", ")),
            };
            (field.key(), value)
        })
        .collect();

    rows.push(("comment", text(lead.comment.as_deref())));
    rows.push(("messages", lead.message_count.to_string()));
    rows.push((
        "created_at",
        lead.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    ));
    rows
}

/// Run health checks and return appropriate exit code.
pub fn check(config_path: Option<&Path>) -> ExitCode {
    println!();
    println!("patty {}", env!("CARGO_PKG_VERSION"));
    println!();

    let config = match Config::load(config_path) {
        Ok(config) => {
            StatusLine::ok("Config loaded").print();
            config
        }
        Err(e) => {
            StatusLine::error(format!("Config: {e:#}")).print();
            println!();
            return ExitCode::FAILURE;
        }
    };

    let lines = [
        check_api_key(&config),
        check_database(&config),
        check_index(&config),
    ];
    for line in &lines {
        line.print();
    }

    println!();
    if lines.iter().any(StatusLine::is_error) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn check_api_key(config: &Config) -> StatusLine {
    if config.llm.resolved_api_key().is_some() {
        StatusLine::ok(format!("API key set ({})", config.llm.model))
    } else {
        StatusLine::error("No API key (set [llm] api_key or OPENAI_API_KEY)")
    }
}

fn check_database(config: &Config) -> StatusLine {
    let path = &config.storage.database;
    match SqliteLeadStore::open(path) {
        Ok(_) => StatusLine::ok(format!("Database {}", path.display())),
        Err(e) => StatusLine::error(format!("Database {}: {e:#}", path.display())),
    }
}

fn check_index(config: &Config) -> StatusLine {
    let (vectors, metadata) = (&config.index.vectors, &config.index.metadata);
    if !vectors.exists() && !metadata.exists() {
        return StatusLine::skip("Resource index (not built, summaries will list no resources)");
    }

    match DocumentIndex::load(vectors, metadata) {
        Ok(index) => StatusLine::ok(format!("Resource index ({} documents)", index.len())),
        Err(e) => StatusLine::error(format!("Resource index: {e:#}")),
    }
}

/// Open the config in `$EDITOR`, writing defaults first if it does not exist.
pub fn config_cmd(config_path: Option<&Path>) -> Result<()> {
    let path = config_path.map_or_else(config::config_path, Path::to_path_buf);

    if !path.exists() {
        Config::default().save(&path)?;
        ui::status::hint(&format!("Wrote default config to {}", path.display()));
    }

    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

    std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("Failed to launch {editor}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::FieldUpdate;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.database = dir.path().join("leads.db");
        config.index.vectors = dir.path().join("vectors.json");
        config.index.metadata = dir.path().join("metadata.json");
        config
    }

    #[test]
    fn rows_follow_asking_order_and_format_phone() {
        let mut lead = Lead::new("conv-1");
        lead.apply(FieldUpdate::LastName("Dupont".into()));
        lead.apply(FieldUpdate::Phone("+33612345678".into()));
        lead.apply(FieldUpdate::Goals(vec![
            "Réduire mes impôts".into(),
            "Préparer ma retraite".into(),
        ]));
        lead.message_count = 4;

        let rows = lead_rows(&lead);
        let keys: Vec<&str> = rows.iter().map(|(k, _)| *k).collect();
        assert_eq!(&keys[..3], ["last_name", "first_name", "email"]);
        assert_eq!(keys.len(), 13);

        let value = |key: &str| rows.iter().find(|(k, _)| *k == key).unwrap().1.clone();
        assert_eq!(value("last_name"), "Dupont");
        assert_eq!(value("first_name"), ui::MISSING);
        assert_eq!(value("comment"), ui::MISSING);
        assert_eq!(value("phone"), "06 12 34 56 78");
        assert_eq!(value("goals"), "Réduire mes impôts, Préparer ma retraite");
        assert_eq!(value("messages"), "4");
    }

    #[test]
    fn missing_index_is_skipped_not_failed() {
        let dir = TempDir::new().unwrap();
        assert!(!check_index(&config_in(&dir)).is_error());
    }

    #[test]
    fn broken_index_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        std::fs::write(&config.index.vectors, "[[1.0, 0.0]]").unwrap();
        std::fs::write(&config.index.metadata, "[]").unwrap();
        assert!(check_index(&config).is_error());
    }

    #[test]
    fn database_check_creates_file() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        assert!(!check_database(&config).is_error());
        assert!(config.storage.database.exists());
    }
}
