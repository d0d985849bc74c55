//! Generator boundary.
//!
//! The external model is reached through the [`LlmClient`] trait so the
//! pipeline can run against a mock in tests. [`GenerationClient`] layers the
//! payload-extraction retry on top: the reply is treated as untrusted text,
//! recorded to the sidecar, and retried exactly once with a direct
//! instruction when no structured payload can be located.

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::prompts;
use crate::spec::{self, ProjectSpec};
use crate::store::Workspace;

/// Chat-completion seam to the external generator.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Client for OpenAI-compatible chat-completion endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system_prompt.trim()},
                {"role": "user", "content": user_prompt}
            ],
            "temperature": 0.1
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("generator API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct Message {
            content: String,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| anyhow!("generator returned no choices"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Spec acquisition with a bounded extraction retry.
pub struct GenerationClient {
    client: Arc<dyn LlmClient>,
    /// Extra attempts after the first call when no payload is extractable.
    /// An explicit bound, not ambient state.
    extraction_retries: u32,
}

impl GenerationClient {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            extraction_retries: 1,
        }
    }

    pub fn with_retries(client: Arc<dyn LlmClient>, extraction_retries: u32) -> Self {
        Self {
            client,
            extraction_retries,
        }
    }

    /// Request a full project spec. Each raw reply is recorded to the
    /// sidecar before any parsing is attempted.
    pub async fn request_spec(
        &self,
        store: &Workspace,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<ProjectSpec, AgentError> {
        for attempt in 0..=self.extraction_retries {
            let prompt = if attempt == 0 {
                user_prompt.to_string()
            } else {
                warn!("no structured payload in generator reply, retrying with direct instruction");
                format!("{}\n\n{}", user_prompt, prompts::DIRECT_PAYLOAD_INSTRUCTION)
            };

            let raw = self
                .client
                .chat(system_prompt, &prompt)
                .await
                .map_err(|e| AgentError::Generation(e.to_string()))?;
            store.record_raw_response(system_prompt, &prompt, &raw)?;

            if let Some(payload) = spec::extract_payload(&raw) {
                return spec::parse_spec(&payload);
            }
        }

        Err(AgentError::Generation(
            "generator returned no structured payload after retry".to_string(),
        ))
    }

    /// Second-pass variant: ask only for the named components, with the same
    /// extraction and retry behavior.
    pub async fn request_named_spec(
        &self,
        store: &Workspace,
        names: &BTreeSet<String>,
        system_prompt: &str,
        description: &str,
    ) -> Result<ProjectSpec, AgentError> {
        let prompt = prompts::missing_components_prompt(description, names);
        self.request_spec(store, system_prompt, &prompt).await
    }
}
