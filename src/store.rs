//! Durable lead storage keyed by conversation id.
//!
//! One row per conversation. Goals and the transcript are stored as JSON text;
//! every other attribute has its own column.

#![allow(clippy::significant_drop_tightening)]

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::lead::{HistoryEntry, Lead};

/// Persistence contract for leads. Saves are upserts, last write wins.
pub trait LeadStore: Send + Sync {
    /// Insert or update the row for `lead.conversation_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the lead cannot be encoded or written.
    fn save(&self, lead: &Lead) -> Result<()>;

    /// Fetch the lead for a conversation, if one was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be queried.
    fn get(&self, conversation_id: &str) -> Result<Option<Lead>>;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id TEXT NOT NULL UNIQUE,
    last_name TEXT,
    first_name TEXT,
    email TEXT,
    phone TEXT,
    age INTEGER,
    marital_status TEXT,
    profession TEXT,
    income TEXT,
    wealth TEXT,
    goals TEXT,
    comment TEXT,
    conversation_history TEXT NOT NULL DEFAULT '[]',
    message_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);";

const UPSERT: &str = "INSERT INTO leads (
    conversation_id, last_name, first_name, email, phone, age, marital_status,
    profession, income, wealth, goals, comment, conversation_history,
    message_count, created_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
ON CONFLICT(conversation_id) DO UPDATE SET
    last_name = excluded.last_name,
    first_name = excluded.first_name,
    email = excluded.email,
    phone = excluded.phone,
    age = excluded.age,
    marital_status = excluded.marital_status,
    profession = excluded.profession,
    income = excluded.income,
    wealth = excluded.wealth,
    goals = excluded.goals,
    comment = excluded.comment,
    conversation_history = excluded.conversation_history,
    message_count = excluded.message_count";

const SELECT: &str = "SELECT conversation_id, last_name, first_name, email, phone, age,
    marital_status, profession, income, wealth, goals, comment, conversation_history,
    message_count, created_at
FROM leads WHERE conversation_id = ?1";

/// `SQLite`-backed [`LeadStore`].
///
/// Thread-safe via internal `Mutex`.
pub struct SqliteLeadStore {
    conn: Mutex<Connection>,
}

impl SqliteLeadStore {
    /// Open or create the lead database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema cannot be created.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl LeadStore for SqliteLeadStore {
    fn save(&self, lead: &Lead) -> Result<()> {
        let goals = lead
            .goals
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode goals")?;
        let history = serde_json::to_string(&lead.conversation_history)
            .context("Failed to encode conversation history")?;

        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {e}"))?;

        conn.execute(
            UPSERT,
            params![
                lead.conversation_id,
                lead.last_name,
                lead.first_name,
                lead.email,
                lead.phone,
                lead.age,
                lead.marital_status,
                lead.profession,
                lead.income,
                lead.wealth,
                goals,
                lead.comment,
                history,
                lead.message_count,
                lead.created_at.to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to save lead {}", lead.conversation_id))?;

        Ok(())
    }

    fn get(&self, conversation_id: &str) -> Result<Option<Lead>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {e}"))?;

        conn.query_row(SELECT, params![conversation_id], lead_from_row)
            .optional()
            .with_context(|| format!("Failed to load lead {conversation_id}"))
    }
}

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
    let conversation_id: String = row.get(0)?;
    let age: Option<i64> = row.get(5)?;
    let goals: Option<String> = row.get(10)?;
    let history: String = row.get(12)?;
    let message_count: i64 = row.get(13)?;
    let created_at: String = row.get(14)?;

    Ok(Lead {
        last_name: row.get(1)?,
        first_name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        age: age.and_then(|a| u8::try_from(a).ok()),
        marital_status: row.get(6)?,
        profession: row.get(7)?,
        income: row.get(8)?,
        wealth: row.get(9)?,
        goals: goals.and_then(|raw| decode_goals(&conversation_id, &raw)),
        comment: row.get(11)?,
        conversation_history: decode_history(&conversation_id, &history),
        message_count: u32::try_from(message_count).unwrap_or(0),
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc)),
        conversation_id,
    })
}

/// Corrupt goal blobs read back as "not collected".
fn decode_goals(conversation_id: &str, raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str(raw) {
        Ok(goals) => Some(goals),
        Err(e) => {
            tracing::warn!("Discarding unreadable goals for {conversation_id}: {e}");
            None
        }
    }
}

/// Corrupt transcripts read back as empty.
fn decode_history(conversation_id: &str, raw: &str) -> Vec<HistoryEntry> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Discarding unreadable history for {conversation_id}: {e}");
        Vec::new()
    })
}
