// Pose estimation bridge
// Runs the external VIBE estimator on a video and collects its vertex output.
// The estimator lives in its own Python environment and is driven as a child
// process through a bridge script that writes `vibe_output.npz`.

use crate::core::config::EstimatorConfig;
use crate::models::pipeline::ProcessOutcome;
use crate::models::pose::{PoseConfig, PoseError, PoseResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// File the estimator writes into its output directory
pub const POSE_OUTPUT_FILE: &str = "vibe_output.npz";

/// Lines of estimator stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// Pose estimator backend
#[async_trait]
pub trait PoseEstimator: Send + Sync {
    /// Run the estimator on `video`, writing its output under `output_dir`.
    /// Returns the path of the written pose output.
    async fn estimate(&self, video: &Path, output_dir: &Path) -> PoseResult<PathBuf>;

    /// Human-readable backend description
    fn model_info(&self) -> String;
}

// ==============================================================================
// VIBE Child Process Backend
// ==============================================================================

pub struct VibeEstimator {
    python: PathBuf,
    script: PathBuf,
    config: PoseConfig,
}

impl VibeEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            python: config.python.clone(),
            script: config.script.clone(),
            config: config.pose.clone(),
        }
    }

    /// Command-line arguments passed to the bridge script
    pub fn arguments(&self, video: &Path, output_dir: &Path) -> Vec<String> {
        let mut args = vec![
            self.script.to_string_lossy().into_owned(),
            "--vid_file".to_string(),
            video.to_string_lossy().into_owned(),
            "--output_folder".to_string(),
            output_dir.to_string_lossy().into_owned(),
            "--tracking_method".to_string(),
            self.config.tracking_method.as_str().to_string(),
        ];
        if self.config.run_smplify {
            args.push("--run_smplify".to_string());
        }
        if self.config.smooth {
            args.push("--smooth".to_string());
        }
        if self.config.no_render {
            args.push("--no_render".to_string());
        }
        args
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[async_trait]
impl PoseEstimator for VibeEstimator {
    async fn estimate(&self, video: &Path, output_dir: &Path) -> PoseResult<PathBuf> {
        if !video.exists() {
            return Err(PoseError::VideoNotFound(video.display().to_string()));
        }
        tokio::fs::create_dir_all(output_dir).await?;

        let args = self.arguments(video, output_dir);
        tracing::info!(python = %self.python.display(), ?args, "Starting pose estimator");
        let start = Instant::now();

        let child = Command::new(&self.python)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PoseError::EstimatorFailed(format!(
                    "Failed to start {}: {}",
                    self.python.display(),
                    e
                ))
            })?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(PoseError::Timeout(self.config.timeout_secs)),
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::debug!(target: "bodymeasure::vibe", "{}", line);
        }

        if !output.status.success() {
            return Err(PoseError::EstimatorFailed(format!(
                "exit status {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "Pose estimator finished");
        Ok(output_dir.join(POSE_OUTPUT_FILE))
    }

    fn model_info(&self) -> String {
        format!(
            "VIBE child process ({} {}) - tracking: {}, smplify: {}, smooth: {}",
            self.python.display(),
            self.script.display(),
            self.config.tracking_method.as_str(),
            self.config.run_smplify,
            self.config.smooth
        )
    }
}

// ==============================================================================
// Stage Entry Point
// ==============================================================================

/// Run the estimator and confirm its output exists.
///
/// The video must exist before any backend is called. Returns `Ok(path)` only
/// when the pose output file is present afterwards.
pub async fn estimate_pose(
    estimator: &dyn PoseEstimator,
    video: &Path,
    output_dir: &Path,
) -> PoseResult<PathBuf> {
    if !tokio::fs::try_exists(video).await.unwrap_or(false) {
        return Err(PoseError::VideoNotFound(video.display().to_string()));
    }

    let result_path = estimator.estimate(video, output_dir).await?;

    if tokio::fs::try_exists(&result_path).await.unwrap_or(false) {
        Ok(result_path)
    } else {
        tracing::error!(path = %result_path.display(), "Pose output missing after estimator run");
        Err(PoseError::ResultMissing)
    }
}

/// Status-envelope form of [`estimate_pose`]
pub async fn process_video(
    estimator: &dyn PoseEstimator,
    video: &Path,
    output_dir: &Path,
) -> ProcessOutcome {
    match estimate_pose(estimator, video, output_dir).await {
        Ok(result_file) => ProcessOutcome::Success { result_file },
        Err(e) => ProcessOutcome::Error {
            message: e.to_string(),
        },
    }
}
