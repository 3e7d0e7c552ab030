//! AG-UI ⇄ A2A run bridge
//!
//! Accepts AG-UI run requests over HTTP, forwards the user's text to a remote
//! A2A agent as a JSON-RPC task, polls the task to completion and streams the
//! progress back as AG-UI server-sent events.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server, one SSE response per run
//! - **Run orchestration**: background task per run (submit, poll, translate)
//! - **A2A client**: JSON-RPC `message/send` and `tasks/get` over reqwest
//!
//! # Modules
//!
//! - [`a2a`]: remote task protocol types and client
//! - [`agui`]: inbound request model, outbound events and SSE framing
//! - [`runtime`]: run orchestrator and output sink
//! - [`api`]: HTTP handlers

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::default_trait_access)]
#![allow(clippy::unused_async)]

pub mod a2a;
pub mod agui;
pub mod api;
pub mod config;
pub mod runtime;
pub mod server;
pub mod telemetry;

use crate::a2a::TaskClient;
use crate::config::AppConfig;
use crate::runtime::RunOrchestrator;

use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Starts runs against the remote agent.
    pub orchestrator: Arc<RunOrchestrator>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, client: Arc<dyn TaskClient>) -> Self {
        let orchestrator = RunOrchestrator::new(client, config.polling);
        Self {
            orchestrator: Arc::new(orchestrator),
            config,
        }
    }
}
