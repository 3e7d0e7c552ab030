//! Per-run identifiers and the poll budget derived from config and overrides.

use std::time::Duration;

use uuid::Uuid;

use crate::agui::{RunOverrides, ValidatedRun};
use crate::config::PollingConfig;

/// Identifiers of one run. Fixed at acceptance; stamped on every event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Caller's conversation id, forwarded to the agent as the context id.
    pub thread_id: String,
    /// Run id on the inbound side, task id on the outbound side.
    pub task_id: String,
    /// Id of the single user message sent to the agent.
    pub message_id: String,
}

impl RunContext {
    /// Take the caller's run id when present, otherwise generate one.
    pub fn for_run(run: &ValidatedRun) -> Self {
        Self {
            thread_id: run.thread_id.clone(),
            task_id: run
                .run_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            message_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Poll cadence and attempt ceiling for one run.
///
/// The ceiling counts attempts, not wall-clock time: a request that only
/// overrides the interval stretches or shrinks the effective timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPlan {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPlan {
    pub fn resolve(defaults: &PollingConfig, overrides: &RunOverrides) -> Self {
        let interval_ms = overrides
            .polling_interval_ms
            .unwrap_or(defaults.interval_ms)
            .max(1);
        let attempts = match overrides.timeout_ms {
            Some(timeout_ms) => timeout_ms.div_ceil(interval_ms),
            None => u64::from(defaults.max_attempts),
        };

        Self {
            interval: Duration::from_millis(interval_ms),
            max_attempts: u32::try_from(attempts).unwrap_or(u32::MAX).max(1),
        }
    }
}
