use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub chat: ChatConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

/// Embedding provider configuration (OpenAI-compatible `/embeddings` API).
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Chat model configuration for the conversation loop and title generation.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub model: String,
    /// Cheap, low-latency model used only for session titles.
    pub title_model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Number of prior turns included in the model-facing message list.
    pub history_window: usize,
    /// Hard cap on model round-trips per turn.
    pub max_iterations: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Vector-phase similarity floor; results below it are discarded.
    pub min_score: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("NOTABENE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("NOTABENE_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:notabene.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "mistral/mistral-embed".to_string()),
                api_key: env::var("EMBEDDING_API_KEY").ok(),
                base_url: env::var("EMBEDDING_BASE_URL").ok(),
                timeout_secs: parse_env_or("EMBEDDING_TIMEOUT", 30),
                max_retries: parse_env_or("EMBEDDING_MAX_RETRIES", 3),
            },
            chat: ChatConfig {
                model: env::var("CHAT_MODEL")
                    .unwrap_or_else(|_| "mistral/mistral-large-latest".to_string()),
                title_model: env::var("CHAT_TITLE_MODEL")
                    .unwrap_or_else(|_| "mistral/ministral-3b-latest".to_string()),
                api_key: env::var("CHAT_API_KEY").ok(),
                base_url: env::var("CHAT_BASE_URL").ok(),
                temperature: parse_env_or("CHAT_TEMPERATURE", 0.3),
                max_tokens: parse_env_or("CHAT_MAX_TOKENS", 800),
                timeout_secs: parse_env_or("CHAT_TIMEOUT", 60),
                max_retries: parse_env_or("CHAT_MAX_RETRIES", 2),
                history_window: parse_env_or("CHAT_HISTORY_WINDOW", 10),
                max_iterations: parse_env_or("CHAT_MAX_ITERATIONS", 3),
            },
            retrieval: RetrievalConfig {
                chunk_size: parse_env_or("CHUNK_SIZE", 150),
                chunk_overlap: parse_env_or("CHUNK_OVERLAP", 30),
                top_k: parse_env_or("SEARCH_TOP_K", 3),
                min_score: parse_env_or("SEARCH_MIN_SCORE", 0.5),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known providers that expose OpenAI-compatible APIs.
pub const KNOWN_PROVIDERS: &[&str] = &["openai", "openrouter", "mistral", "ollama", "lmstudio"];

/// Parse a model name into a (provider, model) tuple.
pub fn parse_provider_model(model: &str) -> (&str, &str) {
    if let Some((prefix, rest)) = model.split_once('/') {
        let prefix_lower = prefix.to_lowercase();
        if KNOWN_PROVIDERS.contains(&prefix_lower.as_str()) {
            return (prefix, rest);
        }
    }
    // Default to treating the whole string as a local model
    ("local", model)
}

/// Default base URL for a provider name.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider.to_lowercase().as_str() {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "mistral" => "https://api.mistral.ai/v1",
        "ollama" => "http://localhost:11434/v1",
        "lmstudio" => "http://localhost:1234/v1",
        _ => "http://localhost:11434/v1",
    }
}

/// True when the provider requires an API key to be configured.
pub fn provider_needs_api_key(provider: &str) -> bool {
    !matches!(
        provider.to_lowercase().as_str(),
        "ollama" | "lmstudio" | "local"
    )
}
