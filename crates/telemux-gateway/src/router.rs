//! Axum router wiring (HTTP -> WS upgrade, ops endpoints).

use axum::{routing::get, Router};

use crate::{app_state::AppState, ops, transport};

/// Versioned upgrade path, served next to `gateway.ws_path`.
pub const VERSIONED_WS_PATH: &str = "/v1/ws";

pub fn build_router(state: AppState) -> Router {
    let ws_path = state.cfg().gateway.ws_path.clone();

    let mut router = Router::new().route(VERSIONED_WS_PATH, get(transport::ws::ws_upgrade));
    if ws_path != VERSIONED_WS_PATH {
        router = router.route(&ws_path, get(transport::ws::ws_upgrade));
    }

    router
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
