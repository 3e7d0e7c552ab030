//! AG-UI ⇄ A2A bridge server
//!
//! Entry point: load configuration, initialize logging, serve HTTP.

use std::sync::Arc;

use mimalloc::MiMalloc;

use agui_a2a_bridge::{config::AppConfig, server, telemetry};

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenvy::dotenv();

    let config = match AppConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Initialize tracing (M-LOG-STRUCTURED)
    telemetry::init(&config.log);

    server::start_server(config).await
}
