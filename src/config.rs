//! Configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Patty configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key. Falls back to `OPENAI_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Per-request timeout for model and embedding calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// The configured key, or `OPENAI_API_KEY` from the environment.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<String> {
        if self.api_key.is_empty() {
            std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|key| !key.is_empty())
        } else {
            Some(self.api_key.clone())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// User messages accepted before the conversation is closed.
    #[serde(default = "default_max_messages")]
    pub max_messages: u32,
    /// Transcript entries given to the extraction model as context.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Number printed in the closing messages.
    #[serde(default = "default_contact_phone")]
    pub contact_phone: String,
    /// Resources recommended in the final summary.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` lead database (`~` is expanded).
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_vectors")]
    pub vectors: PathBuf,
    #[serde(default = "default_metadata")]
    pub metadata: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_max_messages() -> u32 {
    15
}

const fn default_context_window() -> usize {
    3
}

fn default_contact_phone() -> String {
    "01 59 20 06 76".to_string()
}

const fn default_top_k() -> usize {
    3
}

fn default_database() -> PathBuf {
    config_dir().join("leads.db")
}

fn default_vectors() -> PathBuf {
    config_dir().join("embeddings").join("vectors.json")
}

fn default_metadata() -> PathBuf {
    config_dir().join("embeddings").join("metadata.json")
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5000".to_string(),
        "http://127.0.0.1:5000".to_string(),
        "https://doriangdp.github.io".to_string(),
    ]
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            context_window: default_context_window(),
            contact_phone: default_contact_phone(),
            top_k: default_top_k(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            vectors: default_vectors(),
            metadata: default_metadata(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or the default path when `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = path.map_or_else(|| (config_path(), false), |p| (p.to_path_buf(), true));

        if !explicit && !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default().expanded());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
        Ok(config.expanded())
    }

    /// Write configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        Ok(())
    }

    /// Expand `~` in every configured path.
    #[must_use]
    fn expanded(mut self) -> Self {
        self.storage.database = expand(&self.storage.database);
        self.index.vectors = expand(&self.index.vectors);
        self.index.metadata = expand(&self.index.metadata);
        self
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

/// Get the Patty config directory (~/patty).
pub fn config_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("./patty"),
        |d| d.home_dir().join("patty"),
    )
}

/// Get the config file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.chat.max_messages, 15);
        assert_eq!(config.chat.context_window, 3);
        assert_eq!(config.chat.top_k, 3);
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.server.bind, "127.0.0.1:5000");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            "[chat]\nmax_messages = 20\n\n[llm]\napi_key = \"sk-abc\"\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();
        assert_eq!(config.chat.max_messages, 20);
        assert_eq!(config.chat.contact_phone, "01 59 20 06 76");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.llm.resolved_api_key().as_deref(), Some("sk-abc"));
    }

    #[test]
    fn load_explicit_path_expands_tilde() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\ndatabase = \"~/leads.db\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.storage.database.to_string_lossy().starts_with('~'));
        assert!(config.storage.database.ends_with("leads.db"));
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.chat.max_messages = 8;
        config.server.allowed_origins = vec!["https://example.org".to_string()];

        config.save(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.chat.max_messages, 8);
        assert_eq!(loaded.server.allowed_origins, vec!["https://example.org"]);
    }
}
