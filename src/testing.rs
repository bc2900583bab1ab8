//! Collaborator fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde_json::{Value, json};

use crate::config::ChatConfig;
use crate::context::AppContext;
use crate::index::{Document, DocumentSearch};
use crate::lead::Lead;
use crate::llm::{Embedder, ExtractionSchema, LanguageModel, Message};
use crate::store::LeadStore;

/// Replays queued extraction replies; an empty queue extracts nothing.
///
/// Every prompt is recorded. `analysis` is the completion reply, `None` makes
/// completion fail.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Value, String>>>,
    pub prompts: Mutex<Vec<Vec<Message>>>,
    pub completions: Mutex<Vec<Vec<Message>>>,
    pub analysis: Mutex<Option<String>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            analysis: Mutex::new(Some("Analyse personnalisée.".to_string())),
            ..Self::default()
        }
    }

    pub fn push(&self, reply: Value) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_failure(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err("connection reset".to_string()));
    }

    pub fn set_analysis(&self, analysis: Option<&str>) {
        *self.analysis.lock().unwrap() = analysis.map(str::to_string);
    }

    /// Number of extraction calls so far.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl LanguageModel for ScriptedModel {
    fn extract(&self, messages: &[Message], _schema: &ExtractionSchema) -> Result<Value> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Ok(json!({})),
        }
    }

    fn complete(&self, messages: &[Message]) -> Result<String> {
        self.completions.lock().unwrap().push(messages.to_vec());
        self.analysis
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("analysis unavailable"))
    }
}

pub struct FixedEmbedder;

impl Embedder for FixedEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5, 0.5])
    }
}

pub struct Library(pub Vec<Document>);

impl DocumentSearch for Library {
    fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Document>> {
        Ok(self.0.iter().take(k).cloned().collect())
    }
}

/// In-memory store that can be told to fail.
#[derive(Default)]
pub struct MemoryStore {
    pub leads: Mutex<HashMap<String, Lead>>,
    pub fail: AtomicBool,
    pub saves: AtomicUsize,
}

impl LeadStore for MemoryStore {
    fn save(&self, lead: &Lead) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.leads
            .lock()
            .unwrap()
            .insert(lead.conversation_id.clone(), lead.clone());
        Ok(())
    }

    fn get(&self, conversation_id: &str) -> Result<Option<Lead>> {
        Ok(self.leads.lock().unwrap().get(conversation_id).cloned())
    }
}

pub fn library() -> Library {
    Library(vec![
        Document {
            title: "Simulateur PER".to_string(),
            url: "https://ex.fr/simulateur-per".to_string(),
        },
        Document {
            title: "Guide de la défiscalisation".to_string(),
            url: "https://ex.fr/guide".to_string(),
        },
        Document {
            title: "Comprendre les SCPI".to_string(),
            url: "https://ex.fr/scpi".to_string(),
        },
    ])
}

pub fn context(model: Arc<ScriptedModel>, store: Arc<MemoryStore>, max_messages: u32) -> AppContext {
    AppContext {
        model,
        embedder: Arc::new(FixedEmbedder),
        search: Arc::new(library()),
        store,
        chat: ChatConfig {
            max_messages,
            ..ChatConfig::default()
        },
    }
}

/// Model reply filling every required field at once.
pub fn full_profile() -> Value {
    json!({
        "last_name": "Dupont",
        "first_name": "Marie",
        "email": "marie.dupont@example.fr",
        "phone": "06 12 34 56 78",
        "age": 42,
        "marital_status": "mariée",
        "profession": "Fonctionnaire",
        "income": "40 000€ - 60 000€",
        "wealth": { "amount": "100 000€ - 250 000€", "details": "appartement" },
        "goals": ["Réduire mes impôts", "Préparer ma retraite", "Protéger ma famille"]
    })
}
