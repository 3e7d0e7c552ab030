//! Inbound run request and its validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::Role;

/// Body of `POST /agui/run`.
///
/// `thread_id` and `messages` are optional at the serde level so that a
/// missing field is reported as a [`ValidationError`] rather than a generic
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunAgentInput {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<InboundMessage>>,
    #[serde(default)]
    pub config: Option<RunOverrides>,
}

/// One message of the inbound conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl InboundMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            id: None,
        }
    }
}

/// Per-request polling overrides.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunOverrides {
    #[serde(default)]
    pub polling_interval_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// Reasons a run request is rejected before any stream is opened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("thread_id is required")]
    MissingThreadId,
    #[error("messages must be a non-empty array")]
    MissingMessages,
    #[error("config.polling_interval_ms must be greater than zero")]
    ZeroPollInterval,
}

impl ValidationError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingThreadId => "MISSING_THREAD_ID",
            Self::MissingMessages => "MISSING_MESSAGES",
            Self::ZeroPollInterval => "INVALID_POLLING_INTERVAL",
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRun {
    pub thread_id: String,
    pub run_id: Option<String>,
    pub messages: Vec<InboundMessage>,
    pub overrides: RunOverrides,
}

impl ValidatedRun {
    /// All `user` message contents joined by newlines, or `None` when the
    /// conversation holds no user message at all.
    pub fn user_text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n"))
    }
}

impl RunAgentInput {
    pub fn validate(self) -> Result<ValidatedRun, ValidationError> {
        let thread_id = self
            .thread_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::MissingThreadId)?;
        let messages = self
            .messages
            .filter(|m| !m.is_empty())
            .ok_or(ValidationError::MissingMessages)?;
        let overrides = self.config.unwrap_or_default();
        if overrides.polling_interval_ms == Some(0) {
            return Err(ValidationError::ZeroPollInterval);
        }

        Ok(ValidatedRun {
            thread_id,
            run_id: self.run_id.filter(|id| !id.trim().is_empty()),
            messages,
            overrides,
        })
    }
}
