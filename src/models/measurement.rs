// Data models for body measurements

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==============================================================================
// Measurement Names
// ==============================================================================

pub const HEIGHT: &str = "height";
pub const SHOULDER_TO_CROTCH_HEIGHT: &str = "shoulder to crotch height";
pub const ARM_LEFT_LENGTH: &str = "arm left length";
pub const ARM_RIGHT_LENGTH: &str = "arm right length";
pub const INSIDE_LEG_HEIGHT: &str = "inside leg height";
pub const SHOULDER_BREADTH: &str = "shoulder breadth";
pub const TORSO_BACK_LENGTH: &str = "torso back length";

pub const HEAD_CIRCUMFERENCE: &str = "head circumference";
pub const NECK_CIRCUMFERENCE: &str = "neck circumference";
pub const CHEST_CIRCUMFERENCE: &str = "chest circumference";
pub const WAIST_CIRCUMFERENCE: &str = "waist circumference";
pub const HIP_CIRCUMFERENCE: &str = "hip circumference";
pub const WRIST_RIGHT_CIRCUMFERENCE: &str = "wrist right circumference";
pub const BICEP_RIGHT_CIRCUMFERENCE: &str = "bicep right circumference";
pub const FOREARM_RIGHT_CIRCUMFERENCE: &str = "forearm right circumference";
pub const THIGH_LEFT_CIRCUMFERENCE: &str = "thigh left circumference";
pub const CALF_LEFT_CIRCUMFERENCE: &str = "calf left circumference";
pub const ANKLE_LEFT_CIRCUMFERENCE: &str = "ankle left circumference";

/// Letter labels used on measurement charts
pub const STANDARD_LABELS: &[(&str, &str)] = &[
    ("A", HEAD_CIRCUMFERENCE),
    ("B", NECK_CIRCUMFERENCE),
    ("C", SHOULDER_TO_CROTCH_HEIGHT),
    ("D", CHEST_CIRCUMFERENCE),
    ("E", WAIST_CIRCUMFERENCE),
    ("F", HIP_CIRCUMFERENCE),
    ("G", WRIST_RIGHT_CIRCUMFERENCE),
    ("H", BICEP_RIGHT_CIRCUMFERENCE),
    ("I", FOREARM_RIGHT_CIRCUMFERENCE),
    ("J", ARM_RIGHT_LENGTH),
    ("K", INSIDE_LEG_HEIGHT),
    ("L", THIGH_LEFT_CIRCUMFERENCE),
    ("M", CALF_LEFT_CIRCUMFERENCE),
    ("N", ANKLE_LEFT_CIRCUMFERENCE),
    ("O", SHOULDER_BREADTH),
    ("P", HEIGHT),
];

// ==============================================================================
// Measurement Results
// ==============================================================================

/// All computed measurements in centimetres, keyed by measurement name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub values: BTreeMap<String, f64>,
}

impl Measurements {
    pub fn insert(&mut self, name: &str, value_cm: f64) {
        self.values.insert(name.to_string(), value_cm);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Look up a measurement rounded to two decimals
    pub fn require(&self, name: &str) -> MeasureResult<f64> {
        self.get(name)
            .map(|v| round_to(v, 2))
            .ok_or_else(|| MeasureError::MissingMeasurement(name.to_string()))
    }

    /// Map chart labels to the measurements that were computed
    pub fn label_measurements(&self, labels: &[(&str, &str)]) -> BTreeMap<String, f64> {
        labels
            .iter()
            .filter_map(|(label, name)| self.get(name).map(|v| (format!("{} - {}", label, name), v)))
            .collect()
    }
}

/// The flat result returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSet {
    pub height: f64,
    pub chest_circumference: f64,
    pub waist_circumference: f64,
    pub torso_length: f64,
    pub arms_length: f64,
}

impl MeasurementSet {
    /// Extract the client-facing values from the full measurement table
    pub fn from_measurements(measurements: &Measurements) -> MeasureResult<Self> {
        let arm_left = measurements.require(ARM_LEFT_LENGTH)?;
        let arm_right = measurements.require(ARM_RIGHT_LENGTH)?;

        Ok(Self {
            height: round_to(measurements.require(HEIGHT)?, 0),
            chest_circumference: round_to(measurements.require(CHEST_CIRCUMFERENCE)?, 0),
            waist_circumference: round_to(measurements.require(WAIST_CIRCUMFERENCE)?, 0),
            torso_length: round_to(measurements.require(TORSO_BACK_LENGTH)?, 0),
            arms_length: round_to((arm_left + arm_right) / 2.0, 2),
        })
    }
}

/// Round to a number of decimal places, ties to the even neighbour
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    let rounded = if (scaled - scaled.trunc()).abs() == 0.5 {
        2.0 * (scaled / 2.0).round()
    } else {
        scaled.round()
    };
    rounded / factor
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("Measurement '{0}' not computed.")]
    MissingMeasurement(String),

    #[error("Landmark {0} not defined for this mesh")]
    MissingLandmark(String),

    #[error("Landmark index {index} out of range for {vertex_count} vertices")]
    LandmarkOutOfRange { index: usize, vertex_count: usize },

    #[error("Plane through '{0}' does not cut the mesh")]
    EmptySlice(String),

    #[error("Degenerate plane normal for '{0}'")]
    DegeneratePlane(String),

    #[error("Mesh error: {0}")]
    Mesh(#[from] crate::models::mesh::MeshError),
}

pub type MeasureResult<T> = Result<T, MeasureError>;
