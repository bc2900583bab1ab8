//! Language-model and embedding collaborators.
//!
//! The conversation core only sees the [`LanguageModel`] and [`Embedder`]
//! traits. [`OpenAiClient`] implements both against an OpenAI-compatible
//! HTTP API with a bounded timeout and a single attempt per call.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;

/// A chat message sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A named JSON schema the model must fill in.
#[derive(Debug, Clone)]
pub struct ExtractionSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// Chat-completion collaborator.
pub trait LanguageModel: Send + Sync {
    /// Ask the model to fill `schema` from `messages` and return the resulting object.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is not a JSON object.
    fn extract(&self, messages: &[Message], schema: &ExtractionSchema) -> Result<Value>;

    /// Plain free-text completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply has no text.
    fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Text embedding collaborator.
pub trait Embedder: Send + Sync {
    /// Embed `text` into a fixed-length vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply has no vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: ToolCallFunction,
}

#[derive(Deserialize)]
struct ToolCallFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI-compatible client over blocking HTTP.
///
/// Must be called from a thread that may block (not from inside an async task).
pub struct OpenAiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAiClient {
    /// Create a client from config.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is available or the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolved_api_key().context(
            "No API key configured.\n\n\
             Set api_key in the [llm] section of config.toml\n\
             or export OPENAI_API_KEY.",
        )?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<R> {
        let url = format!("{}/{path}", self.base_url);
        tracing::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiError>()
                .map_or_else(|_| format!("HTTP {status}"), |e| e.error.message);
            anyhow::bail!("Model API error ({status}): {message}");
        }

        response
            .json()
            .with_context(|| format!("Failed to parse response from {url}"))
    }

    fn first_message(response: ChatResponse) -> Result<ResponseMessage> {
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("Model returned no choices")
    }
}

impl LanguageModel for OpenAiClient {
    fn extract(&self, messages: &[Message], schema: &ExtractionSchema) -> Result<Value> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools: Some(vec![serde_json::json!({
                "type": "function",
                "function": {
                    "name": schema.name,
                    "description": schema.description,
                    "parameters": schema.parameters,
                }
            })]),
            tool_choice: Some(serde_json::json!({
                "type": "function",
                "function": { "name": schema.name }
            })),
        };

        let response: ChatResponse = self.post("chat/completions", &request)?;
        let message = Self::first_message(response)?;
        let call = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .find(|call| call.function.name == schema.name)
            .with_context(|| format!("Model did not call {}", schema.name))?;

        parse_arguments(&call.function.arguments)
    }

    fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            tools: None,
            tool_choice: None,
        };

        let response: ChatResponse = self.post("chat/completions", &request)?;
        Self::first_message(response)?
            .content
            .filter(|text| !text.trim().is_empty())
            .context("Model returned an empty completion")
    }
}

impl Embedder for OpenAiClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self.post("embeddings", &request)?;
        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .context("Embedding response had no vector")
    }
}

/// Function-call arguments must decode to a JSON object.
fn parse_arguments(arguments: &str) -> Result<Value> {
    let value: Value =
        serde_json::from_str(arguments).context("Function call arguments are not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("Function call arguments are not a JSON object");
    }
    Ok(value)
}
