pub mod config;
pub mod logging;
pub mod uploads;

// Stage 1: pose estimation
pub mod pose_estimator;

// Stage 2: mesh construction
pub mod body_model;
pub mod ply;
pub mod mesh_builder;

// Stage 3: measurement
pub mod landmarks;
pub mod slicing;
pub mod body_measurer;

pub mod pipeline;
