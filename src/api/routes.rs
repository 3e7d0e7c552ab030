use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use axum::{Json, Router, routing::{get, post}};
use serde::Serialize;
use tracing::instrument;

use super::error::ApiError;
use super::sse::{sse_body_stream, sse_response};
use crate::AppState;
use crate::agui::RunAgentInput;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/agui/run", post(run_agent))
        .route("/health", get(health))
}

/// Open a run and stream its events.
///
/// Validation failures answer `400` with no stream. Everything after
/// acceptance, remote failures included, is reported inside the stream.
#[instrument(skip_all)]
async fn run_agent(
    State(state): State<AppState>,
    payload: Result<Json<RunAgentInput>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    let stream = state.orchestrator.execute(input)?;
    tracing::info!(
        thread_id = stream.thread_id(),
        run_id = stream.run_id(),
        "Streaming run"
    );
    Ok(sse_response(sse_body_stream(stream)))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    agent_url: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        agent_url: state.config.agent.base_url.clone(),
    })
}
