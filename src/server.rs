use axum::Router;
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::a2a::HttpTaskClient;
use crate::api;
use crate::config::AppConfig;

/// Assemble the router with middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    api::router()
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

/// Start the HTTP server and block until Ctrl-C.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let client = HttpTaskClient::new(&config.agent)?;
    info!(
        name: "agent.config.loaded",
        endpoint = %client.endpoint(),
        request_timeout_ms = config.agent.request_timeout_ms,
        api_key_set = config.agent.api_key.is_some(),
        "Remote agent configured"
    );

    let state = AppState::new(Arc::clone(&config), Arc::new(client));
    let app = build_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        name: "server.started",
        addr = %addr,
        poll_interval_ms = config.polling.interval_ms,
        max_attempts = config.polling.max_attempts,
        "AG-UI bridge listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!(name: "server.stopping", "Shutdown signal received");
        })
        .await?;
    Ok(())
}
