//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Tidemark using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tidemark - Commerce Analytics ETL
#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(version, about, long_about = None)]
#[command(author = "Tidemark Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tidemark.toml", env = "TIDEMARK_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TIDEMARK_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline for all enabled sources
    Run(commands::run::RunArgs),

    /// Show recent pipeline runs and analytics
    Status(commands::status::StatusArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
