use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;
use crate::noa::sessions::DEFAULT_SESSION_TTL_SECS;

const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_SESSION_SWEEP_SECS: u64 = 60;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub port: u16,
    pub rust_log: String,
    /// Idle seconds before a dialogue session is discarded.
    pub session_ttl_secs: i64,
    pub session_sweep_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            llm_max_tokens: parse_env("LLM_MAX_TOKENS", DEFAULT_MAX_TOKENS)
                .context("LLM_MAX_TOKENS must be a positive integer")?,
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session_ttl_secs: parse_env("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)
                .context("SESSION_TTL_SECS must be an integer number of seconds")?,
            session_sweep_secs: parse_env("SESSION_SWEEP_SECS", DEFAULT_SESSION_SWEEP_SECS)
                .context("SESSION_SWEEP_SECS must be a positive integer")?
                .max(1),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => Ok(raw.trim().parse::<T>()?),
        Err(_) => Ok(default),
    }
}
