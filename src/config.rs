//! Environment-driven configuration.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_WORKSPACE: &str = "workspace";

/// Runtime configuration, loaded once at startup and passed by value.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Directory under which timestamped project directories are created.
    pub workspace_root: PathBuf,
}

impl AgentConfig {
    /// Create from environment variables. `OPENAI_API_KEY` is required;
    /// everything else has a default.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            api_key,
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            workspace_root: std::env::var("DASHGEN_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORKSPACE)),
        })
    }
}
