//! JSON HTTP API over the [`Analyzer`].
pub mod error;
pub mod handlers;
pub mod routes;

use crate::core::Analyzer;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Serves the API until Ctrl-C is received.
pub async fn serve(analyzer: Arc<Analyzer>, addr: SocketAddr) -> Result<()> {
    let api = routes::api(analyzer);
    let (bound, server) = warp::serve(api)
        .try_bind_with_graceful_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down server");
        })
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on http://{}", bound);
    server.await;
    Ok(())
}
