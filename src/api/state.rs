//! State shared by all request handlers

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::core::pipeline::Pipeline;

/// Number of pipeline runs allowed at once; the estimator holds the GPU
pub const MAX_CONCURRENT_JOBS: usize = 1;

pub struct ApiState {
    pub pipeline: Pipeline,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// Permits for pipeline runs
    pub job_slots: Semaphore,
    pub started_at: Instant,
}

pub type ApiStateHandle = Arc<ApiState>;

impl ApiState {
    /// True while every job slot is taken
    pub fn is_busy(&self) -> bool {
        self.job_slots.available_permits() == 0
    }
}

/// Wrap a pipeline into handler state, taking upload settings from its config
pub fn create_state(pipeline: Pipeline) -> ApiStateHandle {
    let upload_dir = pipeline.config().upload_dir.clone();
    let max_upload_bytes = pipeline.config().server.max_upload_bytes;

    Arc::new(ApiState {
        pipeline,
        upload_dir,
        max_upload_bytes,
        job_slots: Semaphore::new(MAX_CONCURRENT_JOBS),
        started_at: Instant::now(),
    })
}
