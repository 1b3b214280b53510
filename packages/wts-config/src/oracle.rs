//! Oracle (external text-generation service) configuration types

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Which concrete oracle backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleProvider {
    OpenAi,
    Gemini,
    Llama,
}

impl OracleProvider {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" => Ok(Self::Gemini),
            "llama" => Ok(Self::Llama),
            other => Err(ConfigError::InvalidValue(
                "INFERENCE_PROVIDER".to_string(),
                format!("unknown provider '{other}', expected openai|gemini|llama"),
            )),
        }
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Gemini => write!(f, "gemini"),
            Self::Llama => write!(f, "llama"),
        }
    }
}

/// Oracle (text-generation) configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub provider: OracleProvider,
    pub model: String,
    /// Base URL, only meaningful for the `Llama` (OpenAI-compatible HTTP) provider
    pub base_url: String,
    /// Credential for `OpenAi`/`Gemini`; absent for `Llama`
    pub credential: Option<String>,
    pub stream_prompts: bool,
    pub timeout_secs: u64,
    pub streaming_timeout_secs: u64,
}

impl OracleConfig {
    /// Load oracle configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let provider =
            OracleProvider::from_str(&get_env_or_default("INFERENCE_PROVIDER", "llama"))?;

        let (model, base_url, credential) = match provider {
            OracleProvider::OpenAi => (
                get_env_or_default("OPENAI_MODEL", "gpt-5"),
                get_env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                Some(Self::required_credential(&[
                    "OPENAI_API_TOKEN",
                    "OPENAI_API_KEY",
                ])?),
            ),
            OracleProvider::Gemini => (
                get_env_or_default("GEMINI_MODEL", "gemini-1.5-pro"),
                get_env_or_default(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                Some(Self::required_credential(&[
                    "GEMINI_API_TOKEN",
                    "GOOGLE_API_KEY",
                ])?),
            ),
            OracleProvider::Llama => (
                get_env_or_default("LLAMA_MODEL", "llama3.1"),
                get_env_or_default("LLAMA_BASE_URL", "http://localhost:11434/v1"),
                None,
            ),
        };

        Ok(Self {
            provider,
            model,
            base_url,
            credential,
            stream_prompts: Self::is_truthy(&get_env_or_default("STREAM_PROMPTS", "false")),
            timeout_secs: parse_env("ORACLE_TIMEOUT_SECS", 120)?,
            streaming_timeout_secs: parse_env("ORACLE_STREAMING_TIMEOUT_SECS", 300)?,
        })
    }

    /// First-found credential from a list of candidate environment variable names
    fn required_credential(names: &[&str]) -> ConfigResult<String> {
        for name in names {
            if let Ok(val) = std::env::var(name) {
                if !val.is_empty() {
                    return Ok(val);
                }
            }
        }
        Err(ConfigError::MissingEnvVar(names.join(" or ")))
    }

    fn is_truthy(val: &str) -> bool {
        matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
    }

    /// Chat-completions style endpoint used by both the OpenAI and Llama providers
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// `generateContent` endpoint for the Gemini provider
    pub fn gemini_generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// `streamGenerateContent` endpoint for the Gemini provider, requested in
    /// server-sent-events form via `alt=sse` so it can be read the same way
    /// as the chat-completions stream.
    pub fn gemini_stream_generate_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}
