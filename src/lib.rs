// Tidemark - Commerce Analytics ETL
// Copyright (c) 2025 Tidemark Contributors
// Licensed under the MIT License

//! # Tidemark - Commerce Analytics ETL
//!
//! Tidemark ingests commerce records (customers, orders, products) from
//! multiple storefront platforms, computes per-customer value and behavioral
//! metrics, and produces daily business aggregates.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Extracting** raw records from Shopify, WooCommerce, and
//!   commercetools APIs with incremental watermarks
//! - **Transforming** platform payloads into canonical entities
//! - **Loading** entities into PostgreSQL with per-entity failure isolation
//! - **Computing** customer lifetime value, RFM segmentation, churn
//!   probability, daily aggregates, and acquisition cohorts
//!
//! ## Architecture
//!
//! Tidemark follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (pipeline, analytics, transform)
//! - [`adapters`] - External integrations (platform connectors, storage)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tidemark::adapters::connectors::create_connectors;
//! use tidemark::adapters::store::{create_store, CommerceStore};
//! use tidemark::config::load_config;
//! use tidemark::core::pipeline::PipelineOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tidemark.toml")?;
//!
//!     let store = create_store(&config)?;
//!     store.ensure_schema().await?;
//!     let connectors = create_connectors(&config)?;
//!
//!     let orchestrator =
//!         PipelineOrchestrator::new(config.pipeline.name.clone(), connectors, store);
//!     let outcomes = orchestrator.run_all().await;
//!
//!     for (source, log) in &outcomes {
//!         println!("{source}: {} ({} loaded)", log.status.as_str(), log.records_loaded);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental Sync
//!
//! Each run's watermark is the completion time of the most recent successful
//! run for the same (pipeline, source) pair, read back from the persisted
//! run logs. A source with no successful history gets a full extraction.
//!
//! ## Failure Isolation
//!
//! Sources run sequentially and independently: a failed run is recorded in
//! its own [`core::pipeline::EtlRunLog`] and never aborts the remaining
//! sources. Within the loading stage, each entity is attempted on its own
//! and per-entity failures accumulate in the run's metadata instead of
//! aborting the batch.
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result<T>`] with the
//! [`domain::TidemarkError`] hierarchy:
//!
//! ```rust,no_run
//! use tidemark::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = tidemark::config::load_config("tidemark.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Tidemark uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(source = "shopify", "Starting run");
//! warn!(order = "o-1", "Failed to upsert order");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
