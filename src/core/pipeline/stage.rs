//! Pipeline stage state machine
//!
//! A run advances through these stages strictly in order and terminates in
//! `Success` or `Failed`. There is no retry loop inside the pipeline;
//! retries are the responsibility of whatever schedules a fresh run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages of one source's pipeline run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Connecting,
    DeterminingWatermark,
    Extracting,
    Transforming,
    Loading,
    ComputingMetrics,
    Success,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Connecting => "connecting",
            PipelineStage::DeterminingWatermark => "determining_watermark",
            PipelineStage::Extracting => "extracting",
            PipelineStage::Transforming => "transforming",
            PipelineStage::Loading => "loading",
            PipelineStage::ComputingMetrics => "computing_metrics",
            PipelineStage::Success => "success",
            PipelineStage::Failed => "failed",
        }
    }

    /// Terminal stages never transition further
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Success | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
