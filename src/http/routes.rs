//! HTTP route definitions

use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{header, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS: the room is public, default to any origin; a comma-separated
    // CLIENT_ORIGIN narrows it
    let cors = if state.config.client_origin.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let allowed_origins: Vec<header::HeaderValue> = state
            .config
            .client_origin
            .split(',')
            .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    // the client bundle is served from the static dir, like the original
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .fallback_service(static_files)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    humans: usize,
    bots: usize,
    walls: usize,
    pickups: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let counters = &state.room.counters;
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        humans: counters.humans.load(Ordering::Relaxed),
        bots: counters.bots.load(Ordering::Relaxed),
        walls: counters.walls.load(Ordering::Relaxed),
        pickups: counters.pickups.load(Ordering::Relaxed),
    })
}
