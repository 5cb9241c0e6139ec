//! API HTTP Server
//!
//! Axum server with request tracing and graceful shutdown.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{api_router, ApiState};

pub struct ApiServer {
    addr: SocketAddr,
    state: ApiState,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, state: ApiState) -> Self {
        Self { addr, state }
    }

    /// Start the server and run until shutdown signal
    pub async fn run(self) -> Result<()> {
        let router = api_router(self.state).layer(TraceLayer::new_for_http());

        if !self.addr.ip().is_loopback() {
            warn!("API bound to {} - it has no authentication", self.addr);
        }

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        info!("AutoRemedy API listening on http://{}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("API server error")?;

        info!("API server shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
