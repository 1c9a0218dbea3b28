//! Inference clients.
//!
//! One prompt in, one completion out. Every call is a single attempt; the
//! orchestrator turns failures into transcript markers rather than retrying.
//! Clients return the model's text as-is; statements are cleaned with
//! [`sanitize_response`] by the caller, votes are not.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::{BackendConfig, Provider};
use crate::error::{DebateError, InferenceError};

/// Sends a prompt to a named model and returns the generated text.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError>;
}

/// Lists the models a backend can serve.
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError>;
}

/// Build the HTTP client shared by every backend.
fn http_client(backend: &BackendConfig) -> Result<reqwest::Client, DebateError> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(backend.accept_invalid_certs)
        .timeout(backend.timeout())
        .connect_timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| DebateError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Client for Ollama's native generate endpoint.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(backend: &BackendConfig) -> Result<Self, DebateError> {
        Ok(Self {
            http: http_client(backend)?,
            base_url: backend.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl InferenceClient for OllamaClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(model, url = %url, "ollama generate");

        let response = self
            .http
            .post(&url)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;
        non_empty(body.response)
    }
}

#[async_trait]
impl ModelCatalog for OllamaClient {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/api/tags", self.base_url);
        let body: TagsResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(dedup_sorted(body.models.into_iter().map(|m| m.name)))
    }
}

/// Client for OpenAI-compatible chat completion APIs.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    pub fn new(backend: &BackendConfig, api_key: impl Into<String>) -> Result<Self, DebateError> {
        let api_key = api_key.into();
        let http = http_client(backend)?;
        let config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&backend.api_base);
        let client = Client::with_config(config).with_http_client(http.clone());

        Ok(Self {
            client,
            http,
            api_base: backend.api_base.trim_end_matches('/').to_string(),
            api_key,
            max_tokens: backend.max_tokens,
        })
    }
}

#[async_trait]
impl InferenceClient for OpenAiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: prompt.to_string().into(),
                name: None,
            },
        )];

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .max_completion_tokens(self.max_tokens)
            .messages(messages)
            .build()?;

        debug!(model, "chat completion");
        let response = self.client.chat().create(request).await?;
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        non_empty(content)
    }
}

#[async_trait]
impl ModelCatalog for OpenAiClient {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        let url = format!("{}/models", self.api_base);
        let body: ModelList = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(dedup_sorted(body.data.into_iter().map(|m| m.id)))
    }
}

/// The configured backend, either provider.
pub enum Backend {
    Ollama(OllamaClient),
    OpenAI(OpenAiClient),
}

impl Backend {
    /// Construct the backend named by the configuration.
    pub fn connect(backend: &BackendConfig, api_key: &str) -> Result<Arc<Self>, DebateError> {
        Ok(Arc::new(match backend.provider {
            Provider::Ollama => Backend::Ollama(OllamaClient::new(backend)?),
            Provider::OpenAI => Backend::OpenAI(OpenAiClient::new(backend, api_key)?),
        }))
    }
}

#[async_trait]
impl InferenceClient for Backend {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, InferenceError> {
        match self {
            Backend::Ollama(client) => client.generate(model, prompt).await,
            Backend::OpenAI(client) => client.generate(model, prompt).await,
        }
    }
}

#[async_trait]
impl ModelCatalog for Backend {
    async fn list_models(&self) -> Result<Vec<String>, InferenceError> {
        match self {
            Backend::Ollama(client) => client.list_models().await,
            Backend::OpenAI(client) => client.list_models().await,
        }
    }
}

pub(crate) fn non_empty(text: String) -> Result<String, InferenceError> {
    if text.trim().is_empty() {
        Err(InferenceError::Empty)
    } else {
        Ok(text)
    }
}

fn dedup_sorted(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.filter(|n| !n.is_empty()).collect();
    names.sort();
    names.dedup();
    names
}

/// Reasoning blocks some models emit around their answer.
const REASONING_TAGS: [&str; 10] = [
    "thinking",
    "think",
    "reflection",
    "reflect",
    "internal",
    "reasoning",
    "thought",
    "scratch",
    "scratchpad",
    "analysis",
];

/// Sanitize AI response by stripping reasoning tokens.
///
/// Removes blocks like <thinking>...</thinking>, <reflection>...</reflection>,
/// etc., then any unmatched tag of the same names. Other angle-bracket text
/// is left alone.
pub fn sanitize_response(response: &str) -> String {
    let mut result = response.to_string();

    for tag in &REASONING_TAGS {
        let pattern = format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>", tag = tag);
        if let Ok(re) = regex::Regex::new(&pattern) {
            result = re.replace_all(&result, "").to_string();
        }
    }

    // Orphaned opening/closing reasoning tags
    let orphan = format!(r"(?i)</?(?:{})\b[^>]*>", REASONING_TAGS.join("|"));
    if let Ok(orphan_re) = regex::Regex::new(&orphan) {
        result = orphan_re.replace_all(&result, "").to_string();
    }

    if let Ok(ws_re) = regex::Regex::new(r"\s+") {
        result = ws_re.replace_all(&result, " ").to_string();
    }

    result.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_response_thinking_tags() {
        let input = "<think>Let me weigh this...</think>Taxes should be lower.";
        assert_eq!(sanitize_response(input), "Taxes should be lower.");
    }

    #[test]
    fn test_sanitize_response_multiline_tags() {
        let input = "<thinking>\nMultiple\nlines\n</thinking>\nI vote for Argument 2.";
        assert_eq!(sanitize_response(input), "I vote for Argument 2.");
    }

    #[test]
    fn test_sanitize_response_keeps_plain_text() {
        let input = "No tags here, just   text.\n\nSecond line.";
        assert_eq!(sanitize_response(input), "No tags here, just text. Second line.");
    }

    #[test]
    fn test_sanitize_response_only_reasoning_is_empty() {
        let input = "<reasoning>all of it</reasoning>";
        assert_eq!(non_empty(sanitize_response(input)), Err(InferenceError::Empty));
    }

    #[test]
    fn test_sanitize_response_keeps_other_angle_brackets() {
        assert_eq!(sanitize_response("<Argument 2> was best"), "<Argument 2> was best");
        assert_eq!(sanitize_response("a <b>bold</b> claim"), "a <b>bold</b> claim");
    }

    #[test]
    fn test_sanitize_response_orphan_reasoning_tag() {
        assert_eq!(sanitize_response("</think> Cities need trains."), "Cities need trains.");
        assert_eq!(sanitize_response("<Thinking>"), "");
    }

    #[test]
    fn test_dedup_sorted_models() {
        let names = vec![
            "mistral".to_string(),
            "llama3:8b".to_string(),
            "mistral".to_string(),
            String::new(),
        ];
        assert_eq!(dedup_sorted(names.into_iter()), vec!["llama3:8b", "mistral"]);
    }
}
