//! API request/response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::measurement::MeasurementSet;
use crate::models::pipeline::PipelineOutcome;

// ============================================================================
// Status Types
// ============================================================================

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// A pipeline run is in progress
    pub busy: bool,
    pub estimator: String,
}

// ============================================================================
// Job Types
// ============================================================================

/// Serverless-style job submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub input: Value,
}

/// Job result; measurements are returned under `measurements` instead of `data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResponse {
    Success { measurements: MeasurementSet },
    Error { message: String },
}

impl JobResponse {
    pub fn error(message: impl Into<String>) -> Self {
        JobResponse::Error {
            message: message.into(),
        }
    }
}

impl From<PipelineOutcome> for JobResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Success { data } => JobResponse::Success { measurements: data },
            PipelineOutcome::Error { message } => JobResponse::Error { message },
        }
    }
}
