use anyhow::Context;
use bodymeasure_lib::api;
use bodymeasure_lib::core::body_measurer::measure_mesh_file;
use bodymeasure_lib::core::body_model::FaceTopology;
use bodymeasure_lib::core::config::Config;
use bodymeasure_lib::core::logging::init_logging;
use bodymeasure_lib::core::mesh_builder::{pose_to_mesh, FrameSelection};
use bodymeasure_lib::core::pipeline::Pipeline;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Estimate body measurements from a video of a person")]
struct Args {
    /// Settings file (defaults to $BODYMEASURE_CONFIG or ~/.bodymeasure/config/settings.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Port to listen on, overriding the settings file
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the full pipeline on one video and print the result
    Run { video: PathBuf },
    /// Build a PLY mesh from estimator output
    Mesh { pose_file: PathBuf, output: PathBuf },
    /// Measure an existing PLY mesh
    Measure { mesh: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match args.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
                .parse()
                .context("Invalid bind address")?;

            let pipeline = Pipeline::from_config(config)?;
            let state = api::create_state(pipeline);
            api::run_server(addr, state, api::shutdown_signal()).await?;
        }
        Command::Run { video } => {
            let pipeline = Pipeline::from_config(config)?;
            let outcome = pipeline.run_full_pipeline(&video).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Command::Mesh { pose_file, output } => {
            let topology = FaceTopology::load(&config.faces_path)?;
            let selection = FrameSelection {
                person: config.person,
                frame_index: config.frame_index,
            };
            let written = pose_to_mesh(&pose_file, &topology, selection, &output)?;
            println!("{}", written.display());
        }
        Command::Measure { mesh } => {
            let measurements = measure_mesh_file(&mesh)?;
            println!("{}", serde_json::to_string_pretty(&measurements)?);
        }
    }

    Ok(())
}
