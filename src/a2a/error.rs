use thiserror::Error;

use super::types::JsonRpcError;

/// Transport failure before any response arrived.
pub const CODE_TRANSPORT: i64 = -32000;
/// The per-call timeout elapsed.
pub const CODE_TIMEOUT: i64 = -32001;
/// The body was not a usable JSON-RPC response.
pub const CODE_PARSE: i64 = -32700;

/// The single failure kind surfaced by a [`TaskClient`](super::TaskClient).
///
/// Transport errors, timeouts, non-2xx responses and JSON-RPC `error`
/// members all collapse into this shape before reaching the orchestrator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub code: i64,
    pub message: String,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn timeout(method: &str) -> Self {
        Self::new(CODE_TIMEOUT, format!("{method} timed out"))
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let message = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {body}")
        };
        Self::new(i64::from(status), message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(CODE_PARSE, message)
    }
}

impl From<JsonRpcError> for RemoteError {
    fn from(err: JsonRpcError) -> Self {
        Self::new(err.code, err.message)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(CODE_TIMEOUT, format!("request timed out: {err}"));
        }
        if err.is_decode() {
            return Self::parse(format!("invalid response body: {err}"));
        }
        if let Some(status) = err.status() {
            return Self::new(i64::from(status.as_u16()), err.to_string());
        }
        Self::new(CODE_TRANSPORT, err.to_string())
    }
}
