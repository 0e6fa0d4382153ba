use crate::error::RagError;
use crate::traits::{ChatRole, ChatTurn, GenerationBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";

/// Generation is the slowest and least bounded dependency; expiry of this
/// timeout surfaces as a normal generation failure.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Gemini REST client for grounded answer generation.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, RagError> {
        Self::with_base_url(api_key, model, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(
        api_key: Option<String>,
        model: impl Into<String>,
        base_url: &str,
    ) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(RagError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, RagError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RagError::Generation("generation API key is not configured".into()))?;

        let contents = turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                };
                json!({
                    "role": role,
                    "parts": [ { "text": turn.text } ],
                })
            })
            .collect::<Vec<_>>();

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", api_key)])
            .json(&json!({ "contents": contents }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RagError::BackendResponse {
                backend: "gemini".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RagError::Generation("response contained no candidate text".into()))
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
