//! Configuration management
//!
//! Tidemark is configured from a TOML file (`tidemark.toml` by default) with
//! `${VAR}` environment substitution and `TIDEMARK_*` environment overrides.
//! The loaded [`TidemarkConfig`] is passed into the orchestrator explicitly;
//! nothing in `core` reads process state directly.

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    ApplicationConfig, DatabaseConfig, LoggingConfig, PipelineConfig, RetryConfig, SourceConfig,
    StoreBackend, TidemarkConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
