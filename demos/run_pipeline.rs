/// Example program to run the full video pipeline with the configured estimator
/// Run with: cargo run --example run_pipeline -- path/to/video.mp4

use bodymeasure_lib::core::config::Config;
use bodymeasure_lib::core::logging::{init_logging, LogConfig};
use bodymeasure_lib::core::pipeline::Pipeline;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging(&LogConfig {
        default_level: "debug".to_string(),
        json_format: false,
    })?;

    let video = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: run_pipeline <video>")?;

    let mut config = Config::load()?;
    config.keep_artifacts = true;
    println!("=== Video Pipeline ===\n");
    println!("Video: {}", video.display());
    println!("Work directory: {}", config.work_dir.display());
    println!("Faces: {}", config.faces_path.display());

    let pipeline = Pipeline::from_config(config)?;
    println!("  Triangles: {}", pipeline.topology().faces.len());
    println!("Estimator: {}\n", pipeline.estimator().model_info());

    let outcome = pipeline.run_full_pipeline(&video).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
