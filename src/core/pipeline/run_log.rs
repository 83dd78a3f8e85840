//! Run log model
//!
//! One [`EtlRunLog`] describes one pipeline run for one source. The log is
//! held in memory while the run is in flight and persisted exactly once at
//! terminal state, after which it is immutable. The most recent successful
//! log per (pipeline, source) doubles as the extraction watermark: its
//! `completed_at` becomes the next run's `since` bound.

use crate::domain::source::SourceType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// In flight (only ever observed in memory)
    Running,
    /// Completed all stages
    Success,
    /// Aborted by a stage-fatal error
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status '{other}'")),
        }
    }
}

/// Record of one pipeline run for one source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlRunLog {
    /// Unique run identifier
    pub run_id: Uuid,

    /// Pipeline this run belongs to; watermarks are scoped to
    /// (pipeline_name, source_type)
    pub pipeline_name: String,

    pub source_type: SourceType,

    pub status: RunStatus,

    /// Raw records fetched from the connector (customers + products + orders)
    pub records_extracted: u64,

    /// Canonical entities produced by normalization
    pub records_transformed: u64,

    /// Entities successfully inserted (customers + products + orders +
    /// order items)
    pub records_loaded: u64,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub duration_seconds: Option<i64>,

    pub error_message: Option<String>,

    /// Free-form run metadata; on success this carries the load summary
    pub metadata: Value,
}

impl EtlRunLog {
    /// Begin a new run record in the `Running` state
    pub fn start(pipeline_name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            source_type,
            status: RunStatus::Running,
            records_extracted: 0,
            records_transformed: 0,
            records_loaded: 0,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            error_message: None,
            metadata: Value::Null,
        }
    }

    /// Transition to `Success`, stamping completion time and metadata
    pub fn mark_success(&mut self, metadata: Value) {
        let completed = Utc::now();
        self.status = RunStatus::Success;
        self.completed_at = Some(completed);
        self.duration_seconds = Some((completed - self.started_at).num_seconds());
        self.metadata = metadata;
    }

    /// Transition to `Failed`, keeping whatever counters were accumulated
    /// up to the failing stage
    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        let completed = Utc::now();
        self.status = RunStatus::Failed;
        self.completed_at = Some(completed);
        self.duration_seconds = Some((completed - self.started_at).num_seconds());
        self.error_message = Some(error_message.into());
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }

    pub fn is_failed(&self) -> bool {
        self.status == RunStatus::Failed
    }
}
