//! Outbound run events and the translator that builds them.
//!
//! Every event carries the run's `thread_id` / `run_id` pair and an epoch
//! millisecond timestamp. Events are built only through an
//! [`EventTranslator`], which is bound to exactly one pair.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

use crate::a2a::{RemoteError, TaskSnapshot, TaskState};

/// Code attached to the run error emitted for a `failed` task.
pub const CODE_TASK_FAILED: &str = "TASK_FAILED";
/// Sentinel code that tells cancellation apart from other failures.
pub const CODE_TASK_CANCELED: &str = "TASK_CANCELED";
/// Code attached when the poll budget runs out.
pub const CODE_POLLING_TIMEOUT: &str = "POLLING_TIMEOUT";
/// Code attached when the request holds no `user` message.
pub const CODE_NO_USER_MESSAGE: &str = "NO_USER_MESSAGE";
/// Code attached when the run task aborts unexpectedly.
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

pub const MSG_TASK_FAILED: &str = "Task failed";
pub const MSG_TASK_CANCELED: &str = "Task canceled";
pub const MSG_POLLING_TIMEOUT: &str = "Polling timeout";
pub const MSG_NO_USER_MESSAGE: &str = "No user message found in request";
pub const MSG_INTERNAL: &str = "Run aborted unexpectedly";

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Payload of a `RUN_ERROR` event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunErrorPayload {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Payload of a `STATE_DELTA` event.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StateDeltaPayload {
    pub bindu_state: TaskState,
}

/// Variant-specific part of an [`OutboundEvent`], tagged by `type`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RunStarted,
    RunFinished,
    RunError {
        error: RunErrorPayload,
    },
    StateDelta {
        delta: StateDeltaPayload,
    },
    TextMessageStart {
        message_id: String,
        role: Role,
    },
    TextMessageContent {
        message_id: String,
        content: String,
    },
    TextMessageEnd {
        message_id: String,
    },
}

impl EventKind {
    /// Name used on the `event:` line of the wire frame.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted => "RUN_STARTED",
            Self::RunFinished => "RUN_FINISHED",
            Self::RunError { .. } => "RUN_ERROR",
            Self::StateDelta { .. } => "STATE_DELTA",
            Self::TextMessageStart { .. } => "TEXT_MESSAGE_START",
            Self::TextMessageContent { .. } => "TEXT_MESSAGE_CONTENT",
            Self::TextMessageEnd { .. } => "TEXT_MESSAGE_END",
        }
    }

    /// `RUN_FINISHED` and `RUN_ERROR` close out a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RunFinished | Self::RunError { .. })
    }
}

/// One record of the outbound run stream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub thread_id: String,
    pub run_id: String,
}

impl OutboundEvent {
    pub fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

/// Builds events for a single run.
///
/// Timestamps come from the wall clock but never go backwards within one
/// translator.
#[derive(Debug)]
pub struct EventTranslator {
    thread_id: String,
    run_id: String,
    last_timestamp: AtomicI64,
}

impl EventTranslator {
    pub fn new(thread_id: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            last_timestamp: AtomicI64::new(i64::MIN),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn stamp(&self, kind: EventKind) -> OutboundEvent {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::Relaxed);
        OutboundEvent {
            kind,
            timestamp: previous.max(now),
            thread_id: self.thread_id.clone(),
            run_id: self.run_id.clone(),
        }
    }

    pub fn run_started(&self) -> OutboundEvent {
        self.stamp(EventKind::RunStarted)
    }

    pub fn run_finished(&self) -> OutboundEvent {
        self.stamp(EventKind::RunFinished)
    }

    pub fn run_error(&self, message: impl Into<String>, code: Option<&str>) -> OutboundEvent {
        self.stamp(EventKind::RunError {
            error: RunErrorPayload {
                message: message.into(),
                code: code.map(ToString::to_string),
            },
        })
    }

    /// Run error for a failed remote call; the numeric remote code is kept.
    pub fn remote_error(&self, err: &RemoteError) -> OutboundEvent {
        self.run_error(err.message.clone(), Some(&err.code.to_string()))
    }

    pub fn polling_timeout(&self) -> OutboundEvent {
        self.run_error(MSG_POLLING_TIMEOUT, Some(CODE_POLLING_TIMEOUT))
    }

    pub fn state_delta(&self, state: TaskState) -> OutboundEvent {
        self.stamp(EventKind::StateDelta {
            delta: StateDeltaPayload { bindu_state: state },
        })
    }

    /// Start / content / end triple for one assistant message.
    pub fn text_message(&self, message_id: &str, text: &str) -> [OutboundEvent; 3] {
        [
            self.stamp(EventKind::TextMessageStart {
                message_id: message_id.to_string(),
                role: Role::Assistant,
            }),
            self.stamp(EventKind::TextMessageContent {
                message_id: message_id.to_string(),
                content: text.to_string(),
            }),
            self.stamp(EventKind::TextMessageEnd {
                message_id: message_id.to_string(),
            }),
        ]
    }

    /// Message id for one artifact part. Derived from position so the same
    /// snapshot always maps to the same ids.
    pub fn message_id_for(&self, artifact_index: usize, part_index: usize) -> String {
        format!("{}-msg-{artifact_index}-{part_index}", self.run_id)
    }

    /// Events for one polled snapshot, given the previously observed state.
    ///
    /// Emits a state delta only when the state changed, followed by the
    /// terminal expansion when the new state is terminal.
    pub fn translate(&self, previous: TaskState, snapshot: &TaskSnapshot) -> Vec<OutboundEvent> {
        let state = snapshot.state();
        let mut events = Vec::new();
        if state != previous {
            events.push(self.state_delta(state));
        }
        if state.is_terminal() {
            events.extend(self.terminal_events(snapshot));
        }
        events
    }

    /// Closing events for a snapshot in a terminal state; empty otherwise.
    pub fn terminal_events(&self, snapshot: &TaskSnapshot) -> Vec<OutboundEvent> {
        match snapshot.state() {
            TaskState::Completed => {
                let mut events = Vec::new();
                for (artifact_index, artifact) in snapshot.artifacts.iter().enumerate() {
                    for (part_index, part) in artifact.parts.iter().enumerate() {
                        if let Some(text) = part.as_text() {
                            let message_id = self.message_id_for(artifact_index, part_index);
                            events.extend(self.text_message(&message_id, text));
                        }
                    }
                }
                events.push(self.run_finished());
                events
            }
            TaskState::Failed => vec![self.run_error(MSG_TASK_FAILED, Some(CODE_TASK_FAILED))],
            TaskState::Canceled => {
                vec![self.run_error(MSG_TASK_CANCELED, Some(CODE_TASK_CANCELED))]
            }
            _ => Vec::new(),
        }
    }
}
