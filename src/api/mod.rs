//! HTTP surface: the run endpoint and a health probe.

pub mod error;
pub mod routes;
pub mod sse;

use axum::Router;

use crate::AppState;

pub use error::ApiError;

pub fn router() -> Router<AppState> {
    routes::build_router()
}
