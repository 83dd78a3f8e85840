//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TidemarkConfig;
use crate::domain::errors::TidemarkError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TidemarkConfig
/// 4. Applies environment variable overrides (TIDEMARK_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tidemark::config::load_config;
///
/// let config = load_config("tidemark.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TidemarkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TidemarkError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TidemarkError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: TidemarkConfig = toml::from_str(&contents)
        .map_err(|e| TidemarkError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        TidemarkError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched so documented placeholders in sample
/// configs don't have to exist in the environment.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(TidemarkError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using the TIDEMARK_* prefix
///
/// Environment variables follow the pattern: TIDEMARK_<SECTION>_<KEY>
/// For example: TIDEMARK_PIPELINE_NAME, TIDEMARK_DATABASE_CONNECTION_STRING
fn apply_env_overrides(config: &mut TidemarkConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("TIDEMARK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Pipeline overrides
    if let Ok(val) = std::env::var("TIDEMARK_PIPELINE_NAME") {
        config.pipeline.name = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_PIPELINE_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.pipeline.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("TIDEMARK_PIPELINE_MAX_RETRIES") {
        if let Ok(retries) = val.parse() {
            config.pipeline.retry.max_retries = retries;
        }
    }

    // Database overrides
    if let Ok(val) = std::env::var("TIDEMARK_DATABASE_BACKEND") {
        config.database.backend = super::schema::StoreBackend::from_env_str(&val)?;
    }
    if let Ok(val) = std::env::var("TIDEMARK_DATABASE_CONNECTION_STRING") {
        config.database.connection_string = val;
    }
    if let Ok(val) = std::env::var("TIDEMARK_DATABASE_MAX_CONNECTIONS") {
        if let Ok(max) = val.parse() {
            config.database.max_connections = max;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("TIDEMARK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("TIDEMARK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    // Per-source enable/disable: TIDEMARK_SOURCE_SHOPIFY_ENABLED etc.
    for source in &mut config.sources {
        let var = format!(
            "TIDEMARK_SOURCE_{}_ENABLED",
            source.kind.as_str().to_uppercase()
        );
        if let Ok(val) = std::env::var(&var) {
            source.enabled = bool::from_str(&val).unwrap_or(source.enabled);
        }
    }

    Ok(())
}
