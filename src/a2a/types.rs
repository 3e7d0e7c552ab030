//! Wire types for the remote agent's JSON-RPC task protocol.

use serde::{Deserialize, Deserializer, Serialize};

/// JSON-RPC method that submits a user message and creates a task.
pub const METHOD_MESSAGE_SEND: &str = "message/send";
/// JSON-RPC method that returns the current snapshot of a task.
pub const METHOD_TASKS_GET: &str = "tasks/get";

/// Lifecycle state of a remote task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    AuthRequired,
    Completed,
    Canceled,
    Failed,
}

impl TaskState {
    /// `completed`, `canceled` and `failed` end a task; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// Wire spelling of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::InputRequired => "input-required",
            Self::AuthRequired => "auth-required",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status block of a task snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    /// ISO 8601 time the remote agent recorded this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// One piece of content inside an artifact.
///
/// Only text parts are forwarded to the run stream; file and data parts are
/// kept so the snapshot deserializes, but carry no outbound meaning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    File {
        #[serde(default)]
        file: serde_json::Value,
    },
    Data {
        #[serde(default)]
        data: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: Some(text.into()),
        }
    }

    /// Text carried by this part, if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => text.as_deref(),
            _ => None,
        }
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Output produced by the remote agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(rename = "artifactId", default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<Part>,
}

/// The remote agent's view of a task at one poll instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSnapshot {
    pub id: String,
    #[serde(rename = "contextId")]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub artifacts: Vec<Artifact>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub history: Vec<serde_json::Value>,
}

impl TaskSnapshot {
    pub fn state(&self) -> TaskState {
        self.status.state
    }
}

/// Outgoing JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<P> {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: &'static str,
    pub params: P,
}

impl<P> JsonRpcRequest<P> {
    pub fn new(method: &'static str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method,
            params,
        }
    }
}

/// Incoming JSON-RPC 2.0 response; exactly one of `result` / `error` is expected.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<R> {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub result: Option<R>,
    pub error: Option<JsonRpcError>,
}

/// Error member of a JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Outbound user message for `message/send`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub kind: &'static str,
    pub role: &'static str,
    pub parts: Vec<Part>,
    pub message_id: String,
    pub context_id: String,
    pub task_id: String,
}

/// Delivery options for `message/send`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendConfiguration {
    pub accepted_output_modes: Vec<&'static str>,
    pub blocking: bool,
}

impl Default for SendConfiguration {
    fn default() -> Self {
        Self {
            accepted_output_modes: vec!["text/plain", "application/json"],
            blocking: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageSendParams {
    pub message: OutboundMessage,
    pub configuration: SendConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub task_id: String,
}
