// Data models for pose output, meshes, measurements and pipeline status

pub mod pose;
pub mod mesh;
pub mod measurement;
pub mod pipeline;
