//! Process-wide collaborators, built once and passed to every turn.

use std::sync::Arc;

use anyhow::Result;

use crate::config::{ChatConfig, Config};
use crate::index::{DocumentIndex, DocumentSearch};
use crate::llm::{Embedder, LanguageModel, OpenAiClient};
use crate::store::{LeadStore, SqliteLeadStore};

/// Everything a turn needs besides the conversation itself.
#[derive(Clone)]
pub struct AppContext {
    pub model: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub search: Arc<dyn DocumentSearch>,
    pub store: Arc<dyn LeadStore>,
    pub chat: ChatConfig,
}

impl AppContext {
    /// Wire the production collaborators from config.
    ///
    /// A missing or unreadable resource index is not fatal: recommendations
    /// then come without resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the model client or the lead database cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(OpenAiClient::from_config(&config.llm)?);
        let store = SqliteLeadStore::open(&config.storage.database)?;

        let index = DocumentIndex::load(&config.index.vectors, &config.index.metadata)
            .unwrap_or_else(|e| {
                tracing::warn!("Resource index unavailable, recommending without it: {e:#}");
                DocumentIndex::default()
            });

        Ok(Self {
            model: client.clone(),
            embedder: client,
            search: Arc::new(index),
            store: Arc::new(store),
            chat: config.chat.clone(),
        })
    }
}
