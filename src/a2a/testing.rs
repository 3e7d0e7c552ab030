//! In-memory [`TaskClient`] double with a scripted sequence of answers.
//!
//! Used by the crate's own tests and, behind the `testing` feature, by
//! downstream tests that want to drive a
//! [`RunOrchestrator`](crate::runtime::RunOrchestrator) without a remote agent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::error::RemoteError;
use super::types::{Artifact, Part, TaskSnapshot, TaskState, TaskStatus};
use super::TaskClient;

/// Arguments of one recorded `submit` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCall {
    pub thread_id: String,
    pub task_id: String,
    pub message_id: String,
    pub text: String,
}

/// Scripted answer to one `get_status` call.
#[derive(Debug, Clone)]
enum Step {
    Snapshot {
        state: TaskState,
        artifacts: Vec<Artifact>,
    },
    Error(RemoteError),
}

/// A [`TaskClient`] that replays queued answers.
///
/// Once the queue is drained every further poll reports `working`.
#[derive(Debug, Default)]
pub struct ScriptedTaskClient {
    submit_error: Option<RemoteError>,
    steps: Mutex<VecDeque<Step>>,
    submits: Mutex<Vec<SubmitCall>>,
    status_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTaskClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `submit` fail with `err`.
    #[must_use]
    pub fn failing_submit(mut self, err: RemoteError) -> Self {
        self.submit_error = Some(err);
        self
    }

    /// Queue a poll answer in `state` with no artifacts.
    #[must_use]
    pub fn then_state(self, state: TaskState) -> Self {
        self.then_artifacts(state, Vec::new())
    }

    /// Queue a poll answer in `state` carrying `artifacts`.
    #[must_use]
    pub fn then_artifacts(self, state: TaskState, artifacts: Vec<Artifact>) -> Self {
        lock(&self.steps).push_back(Step::Snapshot { state, artifacts });
        self
    }

    /// Queue a `completed` answer with one text artifact per entry.
    #[must_use]
    pub fn then_completed_with(self, texts: &[&str]) -> Self {
        let artifacts = texts
            .iter()
            .map(|t| Artifact {
                parts: vec![Part::text(*t)],
                ..Artifact::default()
            })
            .collect();
        self.then_artifacts(TaskState::Completed, artifacts)
    }

    /// Queue a failing poll.
    #[must_use]
    pub fn then_error(self, err: RemoteError) -> Self {
        lock(&self.steps).push_back(Step::Error(err));
        self
    }

    pub fn submit_calls(&self) -> Vec<SubmitCall> {
        lock(&self.submits).clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn snapshot(
        task_id: &str,
        context_id: &str,
        state: TaskState,
        artifacts: Vec<Artifact>,
    ) -> TaskSnapshot {
        TaskSnapshot {
            id: task_id.to_string(),
            context_id: context_id.to_string(),
            status: TaskStatus {
                state,
                timestamp: Some(chrono::Utc::now().to_rfc3339()),
            },
            artifacts,
            history: Vec::new(),
        }
    }

    fn context_id(&self) -> String {
        lock(&self.submits)
            .last()
            .map(|c| c.thread_id.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TaskClient for ScriptedTaskClient {
    async fn submit(
        &self,
        thread_id: &str,
        task_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<TaskSnapshot, RemoteError> {
        lock(&self.submits).push(SubmitCall {
            thread_id: thread_id.to_string(),
            task_id: task_id.to_string(),
            message_id: message_id.to_string(),
            text: text.to_string(),
        });
        if let Some(err) = &self.submit_error {
            return Err(err.clone());
        }
        Ok(Self::snapshot(task_id, thread_id, TaskState::Submitted, Vec::new()))
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot, RemoteError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let step = lock(&self.steps).pop_front();
        match step {
            Some(Step::Snapshot { state, artifacts }) => {
                Ok(Self::snapshot(task_id, &self.context_id(), state, artifacts))
            }
            Some(Step::Error(err)) => Err(err),
            None => Ok(Self::snapshot(
                task_id,
                &self.context_id(),
                TaskState::Working,
                Vec::new(),
            )),
        }
    }
}
