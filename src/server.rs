//! HTTP surface: the realtime WebSocket endpoint plus a few static routes.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::{RelayConfig, ServerConfig};
use crate::relay::Coordinator;

/// Maximum client WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub relay: Arc<RelayConfig>,
}

#[derive(Debug, Serialize)]
struct SessionStatus<'a> {
    status: &'a str,
    model: &'a str,
    voice: &'a str,
}

#[derive(Debug, Serialize)]
struct SessionCreated<'a> {
    session_id: String,
    status: &'a str,
    model: &'a str,
    voice: &'a str,
}

/// Build the full router for `config`.
pub fn router(config: &ServerConfig) -> Router {
    let state = Arc::new(AppState {
        relay: Arc::clone(&config.relay),
    });

    let mut app = api_router(state);
    if config.frontend_dir.is_dir() {
        app = app.merge(frontend_router(&config.frontend_dir));
    } else {
        tracing::debug!(dir = %config.frontend_dir.display(), "Frontend directory not found, serving API only");
    }

    app.layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any),
    )
    .layer(TraceLayer::new_for_http())
}

/// The API and WebSocket routes, without static files or middleware.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/session/status", get(session_status))
        .route("/api/session", post(create_session))
        .route("/ws/realtime", get(realtime_handler))
        .with_state(state)
}

fn frontend_router(dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(dir.join("index.html")))
        .route_service("/admin", ServeFile::new(dir.join("admin.html")))
        .nest_service("/static", ServeDir::new(dir))
}

async fn session_status(State(state): State<Arc<AppState>>) -> Response {
    let persona = &state.relay.persona;
    Json(SessionStatus {
        status: "success",
        model: &persona.model,
        voice: &persona.voice,
    })
    .into_response()
}

async fn create_session(State(state): State<Arc<AppState>>) -> Response {
    let persona = &state.relay.persona;
    Json(SessionCreated {
        session_id: Uuid::new_v4().to_string(),
        status: "created",
        model: &persona.model,
        voice: &persona.voice,
    })
    .into_response()
}

async fn realtime_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let coordinator = Coordinator::new(Arc::clone(&state.relay));
    tracing::info!(session_id = %coordinator.session().id(), "Realtime WebSocket upgrade requested");
    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| coordinator.run(socket))
}
