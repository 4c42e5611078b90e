//! HTTP surface: task submission and liveness.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::error::RequestError;
use crate::orchestrator::Orchestrator;
use crate::validate;

pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Serialize)]
struct Acknowledgment {
    status: &'static str,
    task: String,
    round: u8,
    message: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/api-endpoint", post(submit_task))
        .route("/health", get(health));

    if let Some(ref static_dir) = state.config.static_dir {
        let dir = PathBuf::from(static_dir);
        if dir.exists() {
            tracing::info!("Serving submission page from {}", dir.display());
            app = app
                .route_service("/", tower_http::services::ServeFile::new(dir.join("index.html")))
                .nest_service("/static", tower_http::services::ServeDir::new(&dir));
        } else {
            tracing::warn!("Static dir not found: {}", dir.display());
        }
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

/// Validate, hand off to the orchestrator, acknowledge. Never waits for the run.
async fn submit_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Acknowledgment>), RequestError> {
    let request = validate::validate(&body, &state.config.secret).inspect_err(|e| {
        tracing::warn!(status = %e.status(), error = %e, "Task rejected");
    })?;

    let ack = Acknowledgment {
        status: "processing",
        task: request.task.to_string(),
        round: request.round.into(),
        message: format!(
            "Task '{}' (Round {}) accepted and processing in background",
            request.task, request.round
        ),
    };
    tracing::info!(task = %request.task, round = %request.round, email = %request.email, "Task accepted");

    state.orchestrator.spawn(request);
    Ok((StatusCode::ACCEPTED, Json(ack)))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Bind and serve in the background; returns the bound address.
pub async fn start(
    config: Config,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<anyhow::Result<()>>)> {
    let orchestrator = Arc::new(Orchestrator::new(&config)?);
    let addr = config.listen_addr();
    let state = Arc::new(AppState {
        config: Arc::new(config),
        orchestrator,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(addr = %local, "pagesmith listening");

    let app = router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    });
    Ok((local, handle))
}

/// Serve until the listener fails.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let (_, handle) = start(config).await?;
    handle.await?
}
