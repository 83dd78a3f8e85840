//! Configuration schema types
//!
//! This module defines the configuration structure for Tidemark. Everything
//! the orchestrator needs (enabled sources, credentials, database, retry
//! policy) lives here and is passed in explicitly; core logic never reads
//! ambient process state.

use crate::config::secret::SecretString;
use crate::domain::source::SourceType;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgreSQL database
    Postgres,
    /// In-memory store (tests and dry runs only; nothing survives the process)
    Memory,
}

impl StoreBackend {
    /// Parse an environment-override value
    pub fn from_env_str(s: &str) -> crate::domain::Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(crate::domain::TidemarkError::Configuration(format!(
                "Invalid database backend '{}'. Must be 'postgres' or 'memory'",
                other
            ))),
        }
    }
}

/// Main Tidemark configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TidemarkConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Pipeline identity and extraction tuning
    pub pipeline: PipelineConfig,

    /// Storefront sources to ingest from
    pub sources: Vec<SourceConfig>,

    /// Storage backend selection and connection
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TidemarkConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.pipeline.validate()?;

        if self.sources.is_empty() {
            return Err("At least one [[sources]] entry is required".to_string());
        }
        for source in &self.sources {
            source.validate()?;
        }
        if !self.sources.iter().any(|s| s.enabled) {
            return Err("All configured sources are disabled".to_string());
        }
        // One source per platform: runs are keyed by source type
        let mut enabled_kinds: Vec<SourceType> =
            self.enabled_sources().map(|s| s.kind).collect();
        enabled_kinds.sort();
        enabled_kinds.dedup();
        if enabled_kinds.len() != self.enabled_sources().count() {
            return Err("Multiple enabled sources share the same kind".to_string());
        }

        self.database.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Sources that will actually be processed by a run
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (route all writes to the in-memory store)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Pipeline identity and extraction tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name recorded on run logs; watermarks are scoped to
    /// (pipeline name, source)
    #[serde(default = "default_pipeline_name")]
    pub name: String,

    /// Page size for paginated extraction requests
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Retry policy for connector HTTP requests
    #[serde(default)]
    pub retry: RetryConfig,
}

impl PipelineConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("pipeline.name cannot be empty".to_string());
        }
        if self.page_size == 0 || self.page_size > 250 {
            return Err(format!(
                "pipeline.page_size must be in 1..=250, got {}",
                self.page_size
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_pipeline_name(),
            page_size: default_page_size(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for connector requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per request
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on the backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Multiplier applied to the delay after each failed attempt
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

/// One storefront source
///
/// The credential fields are per-platform; `validate` enforces the set the
/// selected platform requires. Credential values support `${VAR}`
/// environment substitution in the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which platform this source is
    pub kind: SourceType,

    /// Disabled sources are skipped by `run`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base URL of the store API
    /// (e.g. "https://demo.myshopify.com" or "https://shop.example.com")
    pub base_url: String,

    /// Shopify: Admin API access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<SecretString>,

    /// WooCommerce: REST API consumer key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_key: Option<String>,

    /// WooCommerce: REST API consumer secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_secret: Option<SecretString>,

    /// Commercetools: project key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,

    /// Commercetools: OAuth client id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Commercetools: OAuth client secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<SecretString>,

    /// Commercetools: auth server URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err(format!("sources.{}: base_url cannot be empty", self.kind));
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(format!(
                "sources.{}: base_url '{}' is not a valid URL",
                self.kind, self.base_url
            ));
        }

        fn secret_missing(secret: &Option<SecretString>) -> bool {
            secret
                .as_ref()
                .map(|s| s.expose_secret().is_empty())
                .unwrap_or(true)
        }

        match self.kind {
            SourceType::Shopify => {
                if secret_missing(&self.access_token) {
                    return Err("sources.shopify: access_token is required".to_string());
                }
            }
            SourceType::WooCommerce => {
                if self.consumer_key.as_deref().unwrap_or("").is_empty()
                    || secret_missing(&self.consumer_secret)
                {
                    return Err(
                        "sources.woocommerce: consumer_key and consumer_secret are required"
                            .to_string(),
                    );
                }
            }
            SourceType::Commercetools => {
                let mut missing = Vec::new();
                if self.project_key.as_deref().unwrap_or("").is_empty() {
                    missing.push("project_key");
                }
                if self.client_id.as_deref().unwrap_or("").is_empty() {
                    missing.push("client_id");
                }
                if secret_missing(&self.client_secret) {
                    missing.push("client_secret");
                }
                if self.auth_url.as_deref().unwrap_or("").is_empty() {
                    missing.push("auth_url");
                }
                if !missing.is_empty() {
                    return Err(format!(
                        "sources.commercetools: missing required fields: {}",
                        missing.join(", ")
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Backend selection (postgres or memory)
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// PostgreSQL connection string
    /// (e.g. "host=localhost user=tidemark dbname=tidemark")
    #[serde(default)]
    pub connection_string: String,

    /// Maximum pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Timeout for acquiring a pooled connection, in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,

    /// Per-statement timeout, in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,
}

impl DatabaseConfig {
    fn validate(&self) -> Result<(), String> {
        if self.backend == StoreBackend::Postgres && self.connection_string.trim().is_empty() {
            return Err(
                "database.connection_string is required when database.backend = 'postgres'"
                    .to_string(),
            );
        }
        if self.max_connections == 0 {
            return Err("database.max_connections must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON logs to rotating files in addition to the console
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_log_path")]
    pub local_path: String,

    /// Rotation policy: "daily" or "hourly"
    #[serde(default = "default_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path is required when logging.local_enabled".to_string());
        }
        let valid_rotations = ["daily", "hourly"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_log_path(),
            local_rotation: default_rotation(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_pipeline_name() -> String {
    "commerce-etl".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_max_retries() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_backend() -> StoreBackend {
    StoreBackend::Postgres
}

fn default_max_connections() -> usize {
    8
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_statement_timeout() -> u64 {
    120
}

fn default_log_path() -> String {
    "logs".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}
