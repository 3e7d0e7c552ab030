//! Outbound side of the bridge: the remote agent's JSON-RPC task protocol.
//!
//! The orchestrator only sees the [`TaskClient`] trait. [`HttpTaskClient`]
//! is the production implementation; tests substitute scripted doubles.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use client::HttpTaskClient;
pub use error::RemoteError;
pub use types::{Artifact, Part, TaskSnapshot, TaskState, TaskStatus};

/// The two remote operations a run depends on.
///
/// Both calls may be slow and may fail; callers never retry them. Every
/// failure (transport, timeout, protocol error) arrives as a [`RemoteError`].
#[async_trait::async_trait]
pub trait TaskClient: Send + Sync {
    /// Send the user's text as a new message, creating task `task_id`
    /// inside conversation `thread_id`.
    async fn submit(
        &self,
        thread_id: &str,
        task_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<TaskSnapshot, RemoteError>;

    /// Fetch the latest snapshot of `task_id`.
    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot, RemoteError>;
}
