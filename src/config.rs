use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub scorer: ScorerSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// External semantic scorer (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Deserialize)]
pub struct ScorerSettings {
    /// API base; scoring runs fallback-only when unset
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.2 }
fn default_max_tokens() -> usize { 400 }
fn default_timeout_secs() -> u64 { 30 }
fn default_max_concurrency() -> usize { 4 }

/// Where candidates come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    /// JSON file of candidate documents
    #[default]
    Memory,
    /// REST document store
    Http,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    #[serde(default)]
    pub kind: PoolKind,
    /// File path (memory), API base (http) or connection string (postgres)
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_pool_limit")]
    pub limit: usize,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            kind: PoolKind::default(),
            url: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            database_id: String::new(),
            collection: default_collection(),
            limit: default_pool_limit(),
            max_connections: None,
            min_connections: None,
        }
    }
}

fn default_collection() -> String { "ideas".to_string() }
fn default_pool_limit() -> usize { 500 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "default_min_score")]
    pub default_min_score: f64,
    #[serde(default = "default_failure_ratio")]
    pub failure_ratio: f64,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            default_min_score: default_min_score(),
            failure_ratio: default_failure_ratio(),
        }
    }
}

fn default_top_k() -> usize { 10 }
fn default_max_top_k() -> usize { 50 }
fn default_min_score() -> f64 { 0.6 }
fn default_failure_ratio() -> f64 { 0.5 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_cache_capacity() -> u64 { 10_000 }
fn default_cache_ttl() -> u64 { 3600 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PITCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PITCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("PITCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }
}

/// Honour the conventional unprefixed variables for secrets
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(api_key) = env::var("SCORER_API_KEY") {
        builder = builder.set_override("scorer.api_key", api_key)?;
    }
    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("pool.url", database_url)?;
    }

    builder.build()
}
