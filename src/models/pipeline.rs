// Status envelopes returned by the pipeline stages

use crate::models::measurement::MeasurementSet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of the pose-estimation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessOutcome {
    Success { result_file: PathBuf },
    Error { message: String },
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Success { .. })
    }
}

/// Outcome of a full video-to-measurements run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Success { data: MeasurementSet },
    Error { message: String },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn error(message: impl Into<String>) -> Self {
        PipelineOutcome::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_outcome_json() {
        let outcome = PipelineOutcome::error("Processing failed");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"status": "error", "message": "Processing failed"}));
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_success_outcome_json() {
        let outcome = PipelineOutcome::Success {
            data: MeasurementSet {
                height: 172.0,
                chest_circumference: 96.0,
                waist_circumference: 81.0,
                torso_length: 45.0,
                arms_length: 58.25,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["height"], 172.0);
        assert_eq!(json["data"]["arms_length"], 58.25);
    }

    #[test]
    fn test_process_outcome_json() {
        let outcome = ProcessOutcome::Success {
            result_file: PathBuf::from("output/clip/vibe_output.npz"),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["result_file"], "output/clip/vibe_output.npz");
    }
}
