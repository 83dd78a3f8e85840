//! Status command implementation
//!
//! Shows recent pipeline runs per source, and optionally the acquisition
//! cohort table computed from the store's current data.

use crate::adapters::store::{create_store, CommerceStore};
use crate::config::load_config;
use crate::core::analytics::analyze_cohorts;
use crate::domain::source::SourceType;
use clap::Args;
use std::str::FromStr;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by source (shopify, woocommerce, commercetools)
    #[arg(long)]
    pub source: Option<String>,

    /// Number of runs to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Also print acquisition cohorts (requires --source)
    #[arg(long)]
    pub cohorts: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking pipeline status");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let source = match &self.source {
            Some(s) => match SourceType::from_str(s) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    println!("Invalid --source: {e}");
                    return Ok(2);
                }
            },
            None => None,
        };

        let store = match create_store(&config) {
            Ok(s) => s,
            Err(e) => {
                println!("Failed to connect to database");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        let runs = match store.recent_runs(source, self.limit).await {
            Ok(r) => r,
            Err(e) => {
                println!("Failed to load run history");
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        if runs.is_empty() {
            println!("No run history found.");
            println!("Run 'tidemark run' to start ingesting data.");
        } else {
            println!("Recent runs ({} shown):", runs.len());
            println!();
            println!(
                "{:<16} {:<10} {:>10} {:>8} {:>10} {:<20}",
                "Source", "Status", "Extracted", "Loaded", "Duration", "Started"
            );
            println!("{}", "-".repeat(80));

            for run in &runs {
                let duration = run
                    .duration_seconds
                    .map(|s| format!("{s}s"))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<16} {:<10} {:>10} {:>8} {:>10} {:<20}",
                    run.source_type.to_string(),
                    run.status.as_str(),
                    run.records_extracted,
                    run.records_loaded,
                    duration,
                    run.started_at.format("%Y-%m-%d %H:%M:%S")
                );
                if let Some(error) = &run.error_message {
                    println!("    error: {error}");
                }
            }
        }

        if self.cohorts {
            let Some(source) = source else {
                println!();
                println!("--cohorts requires --source");
                return Ok(2);
            };

            let customers = match store.customers_with_orders(source).await {
                Ok(c) => c,
                Err(e) => {
                    println!("Failed to load customers");
                    println!("   Error: {e}");
                    return Ok(5);
                }
            };

            let cohorts = analyze_cohorts(&customers);
            println!();
            if cohorts.is_empty() {
                println!("No cohorts: no customers with a recorded first purchase.");
            } else {
                println!("Acquisition cohorts for {source}:");
                println!();
                println!(
                    "{:<10} {:>10} {:>14} {:>12}",
                    "Cohort", "Customers", "Revenue", "Avg LTV"
                );
                println!("{}", "-".repeat(50));
                for cohort in &cohorts {
                    println!(
                        "{:<10} {:>10} {:>14.2} {:>12.2}",
                        cohort.cohort,
                        cohort.customer_count,
                        cohort.total_revenue,
                        cohort.average_ltv
                    );
                }
            }
        }

        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            source: None,
            limit: 10,
            cohorts: false,
        };
        assert!(args.source.is_none());
        assert_eq!(args.limit, 10);
        assert!(!args.cohorts);
    }
}
