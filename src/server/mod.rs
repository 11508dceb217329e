//! HTTP API for the analysis pipeline.
//!
//! Three surfaces: submit a URL for processing, poll the result, and the
//! transcription webhook that re-enters the pipeline when an audio job
//! finishes.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;

use crate::pipeline::PipelineService;

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineService,
}

/// Start the API server.
pub async fn serve(pipeline: PipelineService, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState { pipeline };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
