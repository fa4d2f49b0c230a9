//! telemux gateway binary.
//!
//! - WebSocket endpoint: /v1/ws
//! - Ops: /healthz, /readyz, /metrics
//! - Periodic buffer flush, graceful shutdown with a final flush

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use telemux_core::error::{GatewayError, Result};
use telemux_gateway::{app_state::AppState, config, router};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, code = e.code().as_str(), "telemux-gateway failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::config_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .gateway
        .listen
        .parse()
        .map_err(|e| GatewayError::BadConfig(format!("gateway.listen must be a valid SocketAddr: {e}")))?;

    let state = AppState::new(cfg)?;
    let gateway = state.gateway();
    let flusher = gateway.buffer().spawn_periodic(state.subscribe_drain());
    let app = router::build_router(state.clone());

    tracing::info!(%listen, config = %path, "telemux-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| GatewayError::Internal(format!("bind {listen} failed: {e}")))?;

    let drain_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutdown requested, draining");
            drain_state.set_draining();
        })
        .await
        .map_err(|e| GatewayError::Internal(format!("server failed: {e}")))?;

    if let Some(handle) = flusher {
        let _ = handle.await;
    }

    let pending = gateway.buffer().len();
    match gateway.buffer().flush().await {
        Ok(report) => tracing::info!(flushed = report.flushed, "final flush complete"),
        Err(e) => tracing::error!(error = %e, pending, "final flush failed, frames lost"),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl_c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
