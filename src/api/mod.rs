//! HTTP API for video submission
//!
//! Multipart upload endpoint, a serverless-style job endpoint and a status endpoint.

pub mod routes;
pub mod server;
pub mod state;
pub mod types;

pub use server::{run_server, shutdown_signal};
pub use state::{create_state, ApiState, ApiStateHandle};
pub use types::*;
