use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the ReadLess server.
#[derive(Debug)]
pub struct Config {
    /// Base URL of the Qdrant instance backing the ingestion cache.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// API key for the OpenAI provider (chat completions and embeddings).
    pub openai_api_key: Option<String>,
    /// API key for the Gemini fallback provider.
    pub gemini_api_key: Option<String>,
    /// Chat model identifier used for the primary provider.
    pub openai_model: String,
    /// Chat model identifier used for the fallback provider.
    pub gemini_model: String,
    /// Embedding model identifier passed to the embeddings endpoint.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Sampling temperature forwarded to completion providers.
    pub temperature: f32,
    /// Default chunk window, in characters, for document splitting.
    pub chunk_size: usize,
    /// Default overlap, in characters, carried between adjacent chunks.
    pub chunk_overlap: usize,
    /// Default number of chunks requested during retrieval.
    pub top_k: usize,
    /// Minimum similarity score accepted from retrieval.
    pub score_threshold: f32,
    /// Number of retries applied to transient external-call failures.
    pub max_retries: u32,
    /// Delay between retry attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Bound applied to every outbound HTTP call, in seconds.
    pub request_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-pro";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_TOP_K: usize = 12;
const DEFAULT_SCORE_THRESHOLD: f32 = 0.25;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1500;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            gemini_api_key: load_env_optional("GEMINI_API_KEY"),
            openai_model: load_env_or("OPENAI_MODEL", DEFAULT_OPENAI_MODEL),
            gemini_model: load_env_or("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
            embedding_model: load_env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension: parse_env_or("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            temperature: parse_env_or("MODEL_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            chunk_size: parse_env_or("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            top_k: parse_env_or("TOP_K", DEFAULT_TOP_K)?,
            score_threshold: parse_env_or("SCORE_THRESHOLD", DEFAULT_SCORE_THRESHOLD)?,
            max_retries: parse_env_or("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_delay_ms: parse_env_or("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?,
            request_timeout_secs: parse_env_or(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };

        if config.openai_api_key.is_none() && config.gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable(
                "OPENAI_API_KEY or GEMINI_API_KEY".to_string(),
            ));
        }
        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".to_string()));
        }

        Ok(config)
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        openai_model = %config.openai_model,
        gemini_model = %config.gemini_model,
        chunk_size = config.chunk_size,
        top_k = config.top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_or_uses_default_when_unset() {
        let value: usize = parse_env_or("READLESS_TEST_UNSET_VARIABLE", 12).expect("default");
        assert_eq!(value, 12);
    }

    #[test]
    fn load_env_or_prefers_default_for_missing_key() {
        assert_eq!(
            load_env_or("READLESS_TEST_MISSING_MODEL", "fallback-model"),
            "fallback-model"
        );
    }
}
