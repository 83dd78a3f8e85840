//! Init command implementation
//!
//! Generates a sample configuration file with placeholders for each
//! supported platform.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "tidemark.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        if Path::new(&self.output).exists() && !self.force {
            println!("Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        match fs::write(&self.output, SAMPLE_CONFIG) {
            Ok(_) => {
                println!("Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your store URLs", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - TIDEMARK_SHOPIFY_TOKEN");
                println!("     - TIDEMARK_WOO_KEY / TIDEMARK_WOO_SECRET");
                println!("     - TIDEMARK_PG (PostgreSQL connection string)");
                println!("  3. Validate configuration: tidemark validate-config");
                println!("  4. Run the pipeline: tidemark run");
                Ok(0)
            }
            Err(e) => {
                println!("Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }
}

const SAMPLE_CONFIG: &str = r#"# Tidemark Configuration File
# Commerce Analytics ETL

[application]
log_level = "info"
dry_run = false

[pipeline]
name = "commerce-etl"
page_size = 100

[pipeline.retry]
max_retries = 3
initial_delay_ms = 500
max_delay_ms = 30000
backoff_multiplier = 2.0

# One [[sources]] block per storefront. Disabled sources are skipped.

[[sources]]
kind = "shopify"
enabled = true
base_url = "https://your-shop.myshopify.com"
access_token = "${TIDEMARK_SHOPIFY_TOKEN}"

[[sources]]
kind = "woocommerce"
enabled = false
base_url = "https://shop.example.com"
consumer_key = "${TIDEMARK_WOO_KEY}"
consumer_secret = "${TIDEMARK_WOO_SECRET}"

[[sources]]
kind = "commercetools"
enabled = false
base_url = "https://api.europe-west1.gcp.commercetools.com"
auth_url = "https://auth.europe-west1.gcp.commercetools.com"
project_key = "your-project"
client_id = "${TIDEMARK_CT_CLIENT_ID}"
client_secret = "${TIDEMARK_CT_CLIENT_SECRET}"

[database]
backend = "postgres"
connection_string = "${TIDEMARK_PG}"
max_connections = 8

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tidemark.toml");
        fs::write(&path, "existing").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            force: false,
        };
        let code = args.execute().await.unwrap();
        assert_eq!(code, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "existing");
    }

    #[tokio::test]
    async fn test_init_writes_sample() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tidemark.toml");

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            force: false,
        };
        let code = args.execute().await.unwrap();
        assert_eq!(code, 0);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[[sources]]"));
        assert!(written.contains("commerce-etl"));
    }
}
