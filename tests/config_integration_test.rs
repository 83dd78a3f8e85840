//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with
//! --test-threads=1 to avoid interference between tests.

use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tidemark::config::{load_config, StoreBackend};
use tidemark::domain::SourceType;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    std::env::remove_var("TIDEMARK_APPLICATION_LOG_LEVEL");
    std::env::remove_var("TIDEMARK_APPLICATION_DRY_RUN");
    std::env::remove_var("TIDEMARK_PIPELINE_NAME");
    std::env::remove_var("TIDEMARK_DATABASE_BACKEND");
    std::env::remove_var("TIDEMARK_DATABASE_CONNECTION_STRING");
    std::env::remove_var("TIDEMARK_SOURCE_SHOPIFY_ENABLED");
    std::env::remove_var("TEST_SHOPIFY_TOKEN");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const FULL_CONFIG: &str = r#"
[application]
log_level = "debug"
dry_run = true

[pipeline]
name = "commerce-etl"
page_size = 50

[pipeline.retry]
max_retries = 5
initial_delay_ms = 250

[[sources]]
kind = "shopify"
enabled = true
base_url = "https://demo.myshopify.com"
access_token = "shpat_test_token"

[[sources]]
kind = "woocommerce"
enabled = false
base_url = "https://shop.example.com"
consumer_key = "ck_test"
consumer_secret = "cs_test"

[database]
backend = "memory"
max_connections = 4

[logging]
local_enabled = false
local_path = "/tmp/tidemark"
local_rotation = "daily"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(FULL_CONFIG);
    let config = load_config(file.path()).expect("Failed to load config");

    assert_eq!(config.application.log_level, "debug");
    assert!(config.application.dry_run);

    assert_eq!(config.pipeline.name, "commerce-etl");
    assert_eq!(config.pipeline.page_size, 50);
    assert_eq!(config.pipeline.retry.max_retries, 5);
    assert_eq!(config.pipeline.retry.initial_delay_ms, 250);
    // Unspecified retry fields keep their defaults
    assert_eq!(config.pipeline.retry.max_delay_ms, 30_000);

    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.sources[0].kind, SourceType::Shopify);
    assert!(config.sources[0].enabled);
    assert_eq!(
        config.sources[0]
            .access_token
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_ref(),
        "shpat_test_token"
    );
    assert_eq!(config.sources[1].kind, SourceType::WooCommerce);
    assert!(!config.sources[1].enabled);

    assert_eq!(config.database.backend, StoreBackend::Memory);
    assert_eq!(config.database.max_connections, 4);
    assert!(!config.logging.local_enabled);

    assert_eq!(config.enabled_sources().count(), 1);
}

#[test]
fn test_env_var_substitution_in_credentials() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_SHOPIFY_TOKEN", "shpat_from_env");

    let file = write_config(
        r#"
[application]
log_level = "info"

[[sources]]
kind = "shopify"
base_url = "https://demo.myshopify.com"
access_token = "${TEST_SHOPIFY_TOKEN}"

[database]
backend = "memory"
"#,
    );

    let config = load_config(file.path()).expect("Failed to load config");
    assert_eq!(
        config.sources[0]
            .access_token
            .as_ref()
            .unwrap()
            .expose_secret()
            .as_ref(),
        "shpat_from_env"
    );

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "info"

[[sources]]
kind = "shopify"
base_url = "https://demo.myshopify.com"
access_token = "${TIDEMARK_DEFINITELY_UNSET_VAR}"

[database]
backend = "memory"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TIDEMARK_DEFINITELY_UNSET_VAR"));
}

#[test]
fn test_env_overrides_take_precedence() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TIDEMARK_PIPELINE_NAME", "nightly-backfill");
    std::env::set_var("TIDEMARK_APPLICATION_LOG_LEVEL", "warn");

    let file = write_config(FULL_CONFIG);
    let config = load_config(file.path()).expect("Failed to load config");

    assert_eq!(config.pipeline.name, "nightly-backfill");
    assert_eq!(config.application.log_level, "warn");

    cleanup_env_vars();
}

#[test]
fn test_validation_rejects_source_without_credentials() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "info"

[[sources]]
kind = "woocommerce"
base_url = "https://shop.example.com"
consumer_key = "ck_only"

[database]
backend = "memory"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("consumer_secret"));
}

#[test]
fn test_validation_rejects_postgres_without_connection_string() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "info"

[[sources]]
kind = "shopify"
base_url = "https://demo.myshopify.com"
access_token = "shpat_x"

[database]
backend = "postgres"
"#,
    );

    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("connection_string"));
}
