use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";
pub const DEFAULT_NEBIUS_BASE_URL: &str = "https://api.studio.nebius.ai/v1/";
pub const DEFAULT_NEBIUS_MODEL: &str = "google/gemma-2-2b-it";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";

/// Which text-generation backend a request is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    Nebius,
    Anthropic,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::Nebius => "nebius",
            LlmProvider::Anthropic => "anthropic",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(LlmProvider::Ollama),
            "nebius" => Ok(LlmProvider::Nebius),
            "anthropic" => Ok(LlmProvider::Anthropic),
            other => bail!("Unknown LLM_PROVIDER '{other}' (expected ollama, nebius or anthropic)"),
        }
    }
}

/// Backend selection handed to the LLM client. One value per pipeline run;
/// nothing about the backend is process-global.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    /// Only used by the OpenAI-compatible providers.
    pub base_url: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    pub llm: LlmConfig,
    pub nebius_base_url: String,
    pub nebius_model: String,
    pub resume_dir: String,
    pub pipeline_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let provider: LlmProvider = optional_env("LLM_PROVIDER")
            .unwrap_or_else(|| "ollama".to_string())
            .parse()?;
        let ollama_base_url =
            optional_env("OLLAMA_BASE_URL").unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string());
        let nebius_base_url =
            optional_env("NEBIUS_BASE_URL").unwrap_or_else(|| DEFAULT_NEBIUS_BASE_URL.to_string());
        let nebius_model =
            optional_env("NEBIUS_MODEL").unwrap_or_else(|| DEFAULT_NEBIUS_MODEL.to_string());

        let (default_model, base_url) = match provider {
            LlmProvider::Ollama => (DEFAULT_OLLAMA_MODEL.to_string(), ollama_base_url),
            LlmProvider::Nebius => (nebius_model.clone(), nebius_base_url.clone()),
            LlmProvider::Anthropic => (DEFAULT_ANTHROPIC_MODEL.to_string(), String::new()),
        };

        let llm = LlmConfig {
            provider,
            model: optional_env("LLM_MODEL").unwrap_or(default_model),
            api_key: optional_env("LLM_API_KEY"),
            base_url,
        };

        if matches!(provider, LlmProvider::Anthropic | LlmProvider::Nebius) && llm.api_key.is_none()
        {
            bail!(
                "LLM_API_KEY must be set when LLM_PROVIDER is '{}'",
                provider.as_str()
            );
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            llm,
            nebius_base_url,
            nebius_model,
            resume_dir: optional_env("RESUME_DIR").unwrap_or_else(|| "resumes".to_string()),
            pipeline_timeout: Duration::from_secs(
                std::env::var("PIPELINE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse::<u64>()
                    .context("PIPELINE_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
        })
    }

    /// Backend config for one request. A caller-supplied Nebius key switches
    /// the run to Nebius; otherwise the process default is used.
    pub fn llm_for_request(&self, nebius_key: Option<&str>) -> LlmConfig {
        match nebius_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => LlmConfig {
                provider: LlmProvider::Nebius,
                model: self.nebius_model.clone(),
                api_key: Some(key.to_string()),
                base_url: self.nebius_base_url.clone(),
            },
            None => self.llm.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
