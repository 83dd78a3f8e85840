//! Run command implementation
//!
//! Executes the pipeline for all enabled sources (or one source with
//! `--source`) and prints a per-source outcome table.

use crate::adapters::connectors::create_connectors;
use crate::adapters::store::{create_store, CommerceStore};
use crate::config::load_config;
use crate::core::pipeline::PipelineOrchestrator;
use crate::domain::source::SourceType;
use chrono::NaiveDate;
use clap::Args;
use std::str::FromStr;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run only this source (shopify, woocommerce, commercetools)
    #[arg(long)]
    pub source: Option<String>,

    /// Calculation date override (YYYY-MM-DD), for backfills
    #[arg(long)]
    pub date: Option<String>,

    /// Dry run mode - extract and compute without touching the database
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Starting run command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.application.dry_run = true;
        }

        // Narrow to one source if requested
        if let Some(source_str) = &self.source {
            let selected = match SourceType::from_str(source_str) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Invalid --source: {e}");
                    return Ok(2);
                }
            };
            for source in &mut config.sources {
                source.enabled = source.enabled && source.kind == selected;
            }
            if !config.sources.iter().any(|s| s.enabled) {
                eprintln!("Source '{selected}' is not configured or not enabled");
                return Ok(2);
            }
        }

        let calculation_date = match &self.date {
            Some(date_str) => match NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                Ok(d) => Some(d),
                Err(_) => {
                    eprintln!("Invalid --date '{date_str}': expected YYYY-MM-DD");
                    return Ok(2);
                }
            },
            None => None,
        };

        let store = match create_store(&config) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create store");
                eprintln!("Failed to connect to database: {e}");
                return Ok(4); // Connection error exit code
            }
        };
        if let Err(e) = store.ensure_schema().await {
            tracing::error!(error = %e, "Schema bootstrap failed");
            eprintln!("Failed to initialize database schema: {e}");
            return Ok(4);
        }

        let connectors = create_connectors(&config)?;

        let mut orchestrator =
            PipelineOrchestrator::new(config.pipeline.name.clone(), connectors, store);
        if let Some(date) = calculation_date {
            orchestrator = orchestrator.with_calculation_date(date);
        }

        let outcomes = orchestrator.run_all().await;

        println!();
        println!(
            "{:<16} {:<10} {:>10} {:>12} {:>8} {:>10}",
            "Source", "Status", "Extracted", "Transformed", "Loaded", "Duration"
        );
        println!("{}", "-".repeat(72));
        for (source, log) in &outcomes {
            let duration = log
                .duration_seconds
                .map(|s| format!("{s}s"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<16} {:<10} {:>10} {:>12} {:>8} {:>10}",
                source.to_string(),
                log.status.as_str(),
                log.records_extracted,
                log.records_transformed,
                log.records_loaded,
                duration
            );
            if let Some(error) = &log.error_message {
                println!("    error: {error}");
            }
        }
        println!();

        let failed = outcomes.values().filter(|l| l.is_failed()).count();
        if failed > 0 {
            println!("{failed} source(s) failed; see run logs for details");
            Ok(1)
        } else {
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_defaults() {
        let args = RunArgs {
            source: None,
            date: None,
            dry_run: false,
        };
        assert!(args.source.is_none());
        assert!(!args.dry_run);
    }
}
