//! Environment-driven configuration. The bot-platform token and the LLM
//! API key are both required; missing either one is a fatal startup
//! condition. Everything else has workable defaults.

use std::path::PathBuf;

pub const ENV_BOT_TOKEN: &str = "BOT_TOKEN";
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";

#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-platform access token, consumed by the transport adapter.
    pub bot_token: String,
    pub llm_api_key: String,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Staging directory for uploaded documents.
    pub upload_dir: PathBuf,
    /// Root for per-user working directories.
    pub work_dir: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(name) => {
                write!(f, "required environment variable {name} is not set")
            }
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bot_token: require(ENV_BOT_TOKEN)?,
            llm_api_key: require(ENV_LLM_API_KEY)?,
            llm_base_url: var_or("LLM_BASE_URL", "https://api.openai.com"),
            llm_model: var_or("LLM_MODEL", "gpt-4o-mini"),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", "data")),
            work_dir: PathBuf::from(var_or("WORK_DIR", "work")),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
