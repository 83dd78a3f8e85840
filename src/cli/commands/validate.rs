//! Validate-config command implementation

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config = %config_path, "Validating configuration");

        match load_config(config_path) {
            Ok(config) => {
                println!("Configuration is valid: {config_path}");
                println!();
                println!("  pipeline: {}", config.pipeline.name);
                println!("  database backend: {:?}", config.database.backend);
                println!("  sources:");
                for source in &config.sources {
                    let state = if source.enabled { "enabled" } else { "disabled" };
                    println!("    - {} ({state}) {}", source.kind, source.base_url);
                }
                Ok(0)
            }
            Err(e) => {
                println!("Configuration is invalid: {config_path}");
                println!("   Error: {e}");
                Ok(2) // Configuration error exit code
            }
        }
    }
}
