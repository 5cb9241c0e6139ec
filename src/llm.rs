//! Language Model Client
//!
//! Text-in/text-out log analysis against an OpenAI-compatible
//! `/chat/completions` endpoint (LM Studio by default).
//!
//! Failures stay typed as [`LlmError`] until [`suggestion_text`] folds them
//! into the in-band `[LLM Error] ...` marker that keyword parsing consumes.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Log target for every language-model exchange
pub const LLM_LOG_TARGET: &str = "llm_analysis";

/// LM Studio ignores the key but requires one
const API_KEY: &str = "lm-studio";

/// Error types for language-model calls
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response contained no choices")]
    EmptyResponse,
}

/// Opaque log-analysis service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Analyze `log_text`; `request_id` correlates the call in logs
    async fn analyze_log(&self, log_text: &str, request_id: Option<&str>) -> Result<String, LlmError>;
}

/// Fold a model result into suggestion text
pub fn suggestion_text(result: Result<String, LlmError>) -> String {
    match result {
        Ok(text) => text,
        Err(e) => format!("[LLM Error] {}", e),
    }
}

/// Chat-completion client configuration
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    /// Base URL, e.g. `http://localhost:1234/v1`
    pub endpoint: String,
    pub model: String,
    /// Instruction placed before the log text
    pub prompt_template: String,
    pub timeout: Duration,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:1234/v1".to_string(),
            model: "llama-3".to_string(),
            prompt_template: "Analyze this log and suggest resolution steps:".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// OpenAI-compatible chat completion client
pub struct ChatCompletionClient {
    config: LlmClientConfig,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    /// Full prompt sent for `log_text`
    pub fn build_prompt(&self, log_text: &str) -> String {
        format!("{}\n{}", self.config.prompt_template, log_text)
    }

    async fn complete(&self, prompt: &str, request_id: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(API_KEY)
            .header("X-Request-Id", request_id)
            .json(&serde_json::json!({
                "model": self.config.model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionClient {
    async fn analyze_log(&self, log_text: &str, request_id: Option<&str>) -> Result<String, LlmError> {
        let request_id = request_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let prompt = self.build_prompt(log_text);
        debug!("LLM request {} ({} chars)", request_id, prompt.len());

        let result = self.complete(&prompt, &request_id).await;

        let logged = match &result {
            Ok(text) => text.clone(),
            Err(e) => format!("[LLM Error] {}", e),
        };
        info!(target: LLM_LOG_TARGET, "{} | {} | {}", request_id, log_text, logged);

        result
    }
}
