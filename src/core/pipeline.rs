// Video to measurements pipeline
// Sequences pose estimation, mesh building and measurement for one video and
// folds every failure into the status envelope returned to clients.

use crate::core::body_measurer::measure_mesh_file;
use crate::core::body_model::FaceTopology;
use crate::core::config::Config;
use crate::core::mesh_builder::{pose_to_mesh, FrameSelection, MeshBuildError};
use crate::core::pose_estimator::{estimate_pose, PoseEstimator, VibeEstimator};
use crate::models::measurement::{MeasureError, MeasurementSet};
use crate::models::mesh::MeshError;
use crate::models::pipeline::PipelineOutcome;
use crate::models::pose::PoseError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Mesh file written by stage 2
pub const MESH_FILE_NAME: &str = "result.ply";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Pose(#[from] PoseError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Measure(#[from] MeasureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline task failed: {0}")]
    Task(String),
}

impl From<MeshBuildError> for PipelineError {
    fn from(err: MeshBuildError) -> Self {
        match err {
            MeshBuildError::Pose(e) => PipelineError::Pose(e),
            MeshBuildError::Mesh(e) => PipelineError::Mesh(e),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Shared pipeline state: configuration, estimator backend and face topology
pub struct Pipeline {
    config: Config,
    estimator: Arc<dyn PoseEstimator>,
    topology: Arc<FaceTopology>,
}

impl Pipeline {
    pub fn new(config: Config, estimator: Arc<dyn PoseEstimator>, topology: FaceTopology) -> Self {
        Self {
            config,
            estimator,
            topology: Arc::new(topology),
        }
    }

    /// Pipeline with the VIBE child-process estimator and the configured faces
    pub fn from_config(config: Config) -> PipelineResult<Self> {
        let topology = FaceTopology::load(&config.faces_path)?;
        let estimator: Arc<dyn PoseEstimator> = Arc::new(VibeEstimator::new(&config.estimator));
        tracing::info!(estimator = %estimator.model_info(), faces = topology.faces.len(), "Pipeline ready");
        Ok(Self::new(config, estimator, topology))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn estimator(&self) -> &dyn PoseEstimator {
        self.estimator.as_ref()
    }

    pub fn topology(&self) -> &FaceTopology {
        &self.topology
    }

    fn frame_selection(&self) -> FrameSelection {
        FrameSelection {
            person: self.config.person,
            frame_index: self.config.frame_index,
        }
    }

    /// Per-run directory `<work_dir>/<video stem>_<timestamp>_<short id>`
    pub fn work_dir_for(&self, video: &Path) -> PathBuf {
        let stem = video
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let id = uuid::Uuid::new_v4().simple().to_string();

        self.config.work_dir.join(format!(
            "{}_{}_{}",
            stem,
            Utc::now().format("%Y%m%d_%H%M%S"),
            &id[..8]
        ))
    }

    /// Run all three stages on `video` and report the status envelope
    pub async fn run_full_pipeline(&self, video: &Path) -> PipelineOutcome {
        let start = Instant::now();
        let work_dir = self.work_dir_for(video);

        let outcome = match self.run_in(video, &work_dir).await {
            Ok(data) => {
                tracing::info!(
                    video = %video.display(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    ?data,
                    "Pipeline finished"
                );
                PipelineOutcome::Success { data }
            }
            Err(e) => {
                tracing::error!(video = %video.display(), error = %e, "Pipeline failed");
                PipelineOutcome::error(e.to_string())
            }
        };

        if !self.config.keep_artifacts {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %work_dir.display(), error = %e, "Failed to remove work directory");
                }
            }
        }

        outcome
    }

    /// Run the stages inside an explicit work directory
    pub async fn run_in(&self, video: &Path, work_dir: &Path) -> PipelineResult<MeasurementSet> {
        tokio::fs::create_dir_all(work_dir).await?;

        tracing::info!(video = %video.display(), work_dir = %work_dir.display(), "Stage 1: pose estimation");
        let pose_file = estimate_pose(self.estimator.as_ref(), video, work_dir).await?;

        tracing::info!(pose_file = %pose_file.display(), "Stage 2: mesh construction");
        let topology = Arc::clone(&self.topology);
        let selection = self.frame_selection();
        let mesh_path = work_dir.join(MESH_FILE_NAME);
        let mesh_file = tokio::task::spawn_blocking(move || {
            pose_to_mesh(&pose_file, &topology, selection, &mesh_path)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;

        tracing::info!(mesh_file = %mesh_file.display(), "Stage 3: measurement");
        let measurements = tokio::task::spawn_blocking(move || measure_mesh_file(&mesh_file))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))??;

        Ok(measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pose::PoseResult;
    use async_trait::async_trait;

    struct FailingEstimator;

    #[async_trait]
    impl PoseEstimator for FailingEstimator {
        async fn estimate(&self, _video: &Path, _output_dir: &Path) -> PoseResult<PathBuf> {
            Err(PoseError::EstimatorFailed("CUDA out of memory".to_string()))
        }

        fn model_info(&self) -> String {
            "failing".to_string()
        }
    }

    struct SilentEstimator;

    #[async_trait]
    impl PoseEstimator for SilentEstimator {
        async fn estimate(&self, _video: &Path, output_dir: &Path) -> PoseResult<PathBuf> {
            Ok(output_dir.join("vibe_output.npz"))
        }

        fn model_info(&self) -> String {
            "silent".to_string()
        }
    }

    fn pipeline(estimator: Arc<dyn PoseEstimator>) -> (Pipeline, PathBuf) {
        let root = std::env::temp_dir().join(format!("pipeline_test_{}", uuid::Uuid::new_v4()));
        let config = Config {
            work_dir: root.join("work"),
            ..Config::default()
        };
        let topology = FaceTopology {
            faces: vec![[0, 1, 2]],
            source: PathBuf::from("memory"),
        };
        (Pipeline::new(config, estimator, topology), root)
    }

    fn write_video(root: &Path) -> PathBuf {
        std::fs::create_dir_all(root).unwrap();
        let video = root.join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();
        video
    }

    #[test]
    fn test_work_dir_naming() {
        let (pipeline, root) = pipeline(Arc::new(SilentEstimator));
        let dir = pipeline.work_dir_for(Path::new("/uploads/abc_walk.mp4"));
        let name = dir.file_name().unwrap().to_string_lossy().into_owned();

        assert!(dir.starts_with(root.join("work")));
        assert!(name.starts_with("abc_walk_"));
        // stem, date, time, id
        assert_eq!(name.rsplitn(4, '_').count(), 4);
        assert_ne!(dir, pipeline.work_dir_for(Path::new("/uploads/abc_walk.mp4")));
    }

    #[tokio::test]
    async fn test_estimator_failure_becomes_error_outcome() {
        let (pipeline, root) = pipeline(Arc::new(FailingEstimator));
        let video = write_video(&root);
        let outcome = pipeline.run_full_pipeline(&video).await;

        assert_eq!(
            outcome,
            PipelineOutcome::error("Pose estimator failed: CUDA out of memory")
        );
        assert!(!root.join("work").exists() || std::fs::read_dir(root.join("work")).unwrap().next().is_none());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_missing_result_reports_processing_failed() {
        let (pipeline, root) = pipeline(Arc::new(SilentEstimator));
        let video = write_video(&root);
        let outcome = pipeline.run_full_pipeline(&video).await;

        assert_eq!(outcome, PipelineOutcome::error("Processing failed"));
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_missing_video_stops_before_estimator() {
        let (pipeline, root) = pipeline(Arc::new(FailingEstimator));
        let video = root.join("absent.mp4");
        let outcome = pipeline.run_full_pipeline(&video).await;

        assert_eq!(
            outcome,
            PipelineOutcome::error(format!("Video file not found: {}", video.display()))
        );
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn test_error_conversion_keeps_stage_message() {
        let err: PipelineError = MeshBuildError::Pose(PoseError::NoPersonDetected).into();
        assert_eq!(err.to_string(), "No person detected in video");

        let err: PipelineError = MeasureError::MissingMeasurement("height".to_string()).into();
        assert_eq!(err.to_string(), "Measurement 'height' not computed.");
    }
}
