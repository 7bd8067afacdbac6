// Video to body measurements service
//
// Stage 1 runs an external pose estimator on an uploaded video, stage 2 turns
// the selected person's vertices into a PLY mesh, stage 3 measures the mesh.

pub mod api;
pub mod core;
pub mod models;

pub use crate::core::config::Config;
pub use crate::core::pipeline::{Pipeline, PipelineError};
pub use crate::models::measurement::MeasurementSet;
pub use crate::models::pipeline::PipelineOutcome;
