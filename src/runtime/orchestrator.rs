//! Run orchestration: submit once, poll until terminal, stream the result.
//!
//! [`RunOrchestrator::execute`] validates the request and hands back a live
//! [`RunStream`] straight away. The rest happens in a spawned task:
//!
//! 1. Submit the user text to the agent (or emit an error when there is none)
//! 2. Emit `RUN_STARTED`
//! 3. Sleep, poll, translate the snapshot; repeat until a terminal state,
//!    a failed poll, a disconnected consumer or an exhausted budget
//! 4. Close the stream, whatever happened above

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::a2a::{TaskClient, TaskState};
use crate::agui::events::{
    CODE_INTERNAL, CODE_NO_USER_MESSAGE, MSG_INTERNAL, MSG_NO_USER_MESSAGE,
};
use crate::agui::{EventTranslator, RunAgentInput, ValidationError};
use crate::config::PollingConfig;

use super::context::{PollPlan, RunContext};
use super::sink::{DEFAULT_BUFFER, EventSink, RunStream};

/// Entry point for inbound runs. Cheap to clone; runs share nothing but the
/// task client.
#[derive(Clone)]
pub struct RunOrchestrator {
    client: Arc<dyn TaskClient>,
    polling: PollingConfig,
    buffer: usize,
}

impl std::fmt::Debug for RunOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOrchestrator")
            .field("client", &"dyn TaskClient")
            .field("polling", &self.polling)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl RunOrchestrator {
    pub fn new(client: Arc<dyn TaskClient>, polling: PollingConfig) -> Self {
        Self {
            client,
            polling,
            buffer: DEFAULT_BUFFER,
        }
    }

    /// Override the number of frames buffered per run.
    #[must_use]
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    /// Validate `input` and start the run in the background.
    ///
    /// Returns before any remote call completes. Must be called from within
    /// a tokio runtime.
    pub fn execute(&self, input: RunAgentInput) -> Result<RunStream, ValidationError> {
        self.launch(input).map(|(stream, _)| stream)
    }

    /// Like [`execute`](Self::execute), also returning the run task's handle.
    pub fn launch(
        &self,
        input: RunAgentInput,
    ) -> Result<(RunStream, JoinHandle<()>), ValidationError> {
        let run = input.validate()?;
        let ctx = RunContext::for_run(&run);
        let plan = PollPlan::resolve(&self.polling, &run.overrides);
        let (sink, stream) = EventSink::channel(self.buffer, &ctx.thread_id, &ctx.task_id);

        let span = tracing::info_span!(
            "agui.run",
            thread_id = %ctx.thread_id,
            run_id = %ctx.task_id,
        );
        tracing::info!(
            parent: &span,
            messages = run.messages.len(),
            poll_interval_ms = u64::try_from(plan.interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts = plan.max_attempts,
            "Run accepted"
        );

        let task = RunTask {
            client: Arc::clone(&self.client),
            translator: EventTranslator::new(&ctx.thread_id, &ctx.task_id),
            user_text: run.user_text(),
            ctx,
            plan,
        };
        let handle = tokio::spawn(task.run(sink).instrument(span));

        Ok((stream, handle))
    }
}

/// Everything one background run owns.
struct RunTask {
    client: Arc<dyn TaskClient>,
    translator: EventTranslator,
    ctx: RunContext,
    plan: PollPlan,
    user_text: Option<String>,
}

impl RunTask {
    async fn run(self, mut sink: EventSink) {
        let outcome = AssertUnwindSafe(self.drive(&mut sink)).catch_unwind().await;

        if outcome.is_err() {
            tracing::error!("Run task panicked");
            if !sink.terminal_sent() {
                let event = self.translator.run_error(MSG_INTERNAL, Some(CODE_INTERNAL));
                sink.emit(&event).await;
            }
        }

        sink.close();
        tracing::debug!("Run stream closed");
    }

    async fn drive(&self, sink: &mut EventSink) {
        let tr = &self.translator;
        let ctx = &self.ctx;

        let Some(text) = self.user_text.as_deref() else {
            tracing::warn!("Request has no user message; nothing to submit");
            sink.emit(&tr.run_error(MSG_NO_USER_MESSAGE, Some(CODE_NO_USER_MESSAGE)))
                .await;
            return;
        };

        if let Err(err) = self
            .client
            .submit(&ctx.thread_id, &ctx.task_id, &ctx.message_id, text)
            .await
        {
            tracing::error!(code = err.code, error = %err, "Task submission failed");
            sink.emit(&tr.remote_error(&err)).await;
            return;
        }
        tracing::info!(message_id = %ctx.message_id, "Task submitted");

        if !sink.emit(&tr.run_started()).await {
            return;
        }

        let mut last_state = TaskState::Submitted;
        for attempt in 1..=self.plan.max_attempts {
            tokio::time::sleep(self.plan.interval).await;

            if !sink.is_open() {
                tracing::info!(attempt, "Consumer disconnected; polling stopped");
                return;
            }

            let snapshot = match self.client.get_status(&ctx.task_id).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::error!(attempt, code = err.code, error = %err, "Status query failed");
                    sink.emit(&tr.remote_error(&err)).await;
                    return;
                }
            };

            let state = snapshot.state();
            if state != last_state {
                tracing::debug!(attempt, from = %last_state, to = %state, "Task state changed");
            }

            for event in tr.translate(last_state, &snapshot) {
                if !sink.emit(&event).await {
                    return;
                }
            }
            last_state = state;

            if state.is_terminal() {
                tracing::info!(attempt, state = %state, "Run finished");
                return;
            }
        }

        tracing::warn!(
            max_attempts = self.plan.max_attempts,
            last_state = %last_state,
            "Polling budget exhausted"
        );
        sink.emit(&tr.polling_timeout()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::RemoteError;
    use crate::a2a::testing::ScriptedTaskClient;
    use crate::agui::{Frame, InboundMessage, RunOverrides, decode_frames};
    use futures::StreamExt;
    use std::time::Duration;

    fn polling() -> PollingConfig {
        PollingConfig {
            interval_ms: 10,
            max_attempts: 5,
        }
    }

    fn input(messages: Vec<InboundMessage>) -> RunAgentInput {
        RunAgentInput {
            thread_id: Some("t1".into()),
            run_id: Some("r1".into()),
            messages: Some(messages),
            config: None,
        }
    }

    fn hi() -> RunAgentInput {
        input(vec![InboundMessage::user("hi")])
    }

    async fn run_to_end(client: Arc<ScriptedTaskClient>, input: RunAgentInput) -> Vec<Frame> {
        let orchestrator = RunOrchestrator::new(client, polling());
        let stream = orchestrator.execute(input).unwrap();
        let chunks: Vec<_> = stream.collect().await;
        let body: String = chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        decode_frames(&body)
    }

    fn types(frames: &[Frame]) -> Vec<&str> {
        frames.iter().map(|f| f.event.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_sequence() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_state(TaskState::Working)
                .then_completed_with(&["hello"]),
        );
        let frames = run_to_end(Arc::clone(&client), hi()).await;

        assert_eq!(
            types(&frames),
            vec![
                "RUN_STARTED",
                "STATE_DELTA",
                "STATE_DELTA",
                "TEXT_MESSAGE_START",
                "TEXT_MESSAGE_CONTENT",
                "TEXT_MESSAGE_END",
                "RUN_FINISHED",
            ]
        );
        assert_eq!(frames[1].data["delta"]["bindu_state"], "working");
        assert_eq!(frames[2].data["delta"]["bindu_state"], "completed");
        assert_eq!(frames[4].data["content"], "hello");
        assert_eq!(frames[3].data["role"], "assistant");
        assert_eq!(client.status_calls(), 2);

        let submits = client.submit_calls();
        assert_eq!(submits.len(), 1);
        assert_eq!(submits[0].thread_id, "t1");
        assert_eq!(submits[0].task_id, "r1");
        assert_eq!(submits[0].text, "hi");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ids_stamped_on_every_event() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_state(TaskState::Working)
                .then_completed_with(&["a", "b"]),
        );
        let frames = run_to_end(client, hi()).await;
        assert!(!frames.is_empty());
        for frame in frames {
            assert_eq!(frame.data["thread_id"], "t1");
            assert_eq!(frame.data["run_id"], "r1");
            assert_eq!(frame.data["type"], frame.event.as_str());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_state_emits_single_delta() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_state(TaskState::Working)
                .then_state(TaskState::Working)
                .then_state(TaskState::Working)
                .then_completed_with(&[]),
        );
        let frames = run_to_end(client, hi()).await;
        assert_eq!(
            types(&frames),
            vec!["RUN_STARTED", "STATE_DELTA", "STATE_DELTA", "RUN_FINISHED"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitted_state_is_not_a_change() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_state(TaskState::Submitted)
                .then_completed_with(&[]),
        );
        let frames = run_to_end(client, hi()).await;
        assert_eq!(
            types(&frames),
            vec!["RUN_STARTED", "STATE_DELTA", "RUN_FINISHED"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_user_message_skips_submit() {
        let client = Arc::new(ScriptedTaskClient::new());
        let frames = run_to_end(
            Arc::clone(&client),
            input(vec![InboundMessage::assistant("hello")]),
        )
        .await;

        assert_eq!(types(&frames), vec!["RUN_ERROR"]);
        assert_eq!(frames[0].data["error"]["code"], CODE_NO_USER_MESSAGE);
        assert!(client.submit_calls().is_empty());
        assert_eq!(client.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failure_emits_only_error() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .failing_submit(RemoteError::new(-32000, "connection refused")),
        );
        let frames = run_to_end(Arc::clone(&client), hi()).await;

        assert_eq!(types(&frames), vec!["RUN_ERROR"]);
        assert_eq!(frames[0].data["error"]["message"], "connection refused");
        assert_eq!(client.status_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_is_immediately_fatal() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_state(TaskState::Working)
                .then_error(RemoteError::new(-32001, "Task not found"))
                .then_completed_with(&["never"]),
        );
        let frames = run_to_end(Arc::clone(&client), hi()).await;

        assert_eq!(types(&frames), vec!["RUN_STARTED", "STATE_DELTA", "RUN_ERROR"]);
        assert_eq!(frames[2].data["error"]["message"], "Task not found");
        assert_eq!(client.status_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_emits_timeout() {
        let client = Arc::new(ScriptedTaskClient::new());
        let frames = run_to_end(Arc::clone(&client), hi()).await;

        assert_eq!(types(&frames), vec!["RUN_STARTED", "STATE_DELTA", "RUN_ERROR"]);
        assert_eq!(frames[2].data["error"]["message"], "Polling timeout");
        assert_eq!(client.status_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_override_sets_attempts() {
        let client = Arc::new(ScriptedTaskClient::new());
        let mut req = input(vec![InboundMessage::user("hi")]);
        req.config = Some(RunOverrides {
            polling_interval_ms: Some(100),
            timeout_ms: Some(250),
        });
        let frames = run_to_end(Arc::clone(&client), req).await;

        assert_eq!(frames.last().unwrap().data["error"]["message"], "Polling timeout");
        assert_eq!(client.status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_and_canceled_terminals() {
        let client = Arc::new(ScriptedTaskClient::new().then_state(TaskState::Failed));
        let frames = run_to_end(client, hi()).await;
        assert_eq!(types(&frames), vec!["RUN_STARTED", "STATE_DELTA", "RUN_ERROR"]);
        assert_eq!(frames[2].data["error"]["message"], "Task failed");

        let client = Arc::new(ScriptedTaskClient::new().then_state(TaskState::Canceled));
        let frames = run_to_end(client, hi()).await;
        assert_eq!(frames[2].data["error"]["message"], "Task canceled");
        assert_eq!(frames[2].data["error"]["code"], "TASK_CANCELED");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_polling_after_terminal() {
        let client = Arc::new(
            ScriptedTaskClient::new()
                .then_completed_with(&["done"])
                .then_state(TaskState::Working),
        );
        let orchestrator = RunOrchestrator::new(Arc::clone(&client) as _, polling());
        let (stream, handle) = orchestrator
            .launch(input(vec![InboundMessage::user("hi")]))
            .unwrap();
        let _: Vec<_> = stream.collect().await;
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.status_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_stops_polling() {
        let client = Arc::new(ScriptedTaskClient::new());
        let polling = PollingConfig {
            interval_ms: 10,
            max_attempts: 1000,
        };
        let orchestrator = RunOrchestrator::new(Arc::clone(&client) as _, polling);
        let (mut stream, handle) = orchestrator
            .launch(input(vec![InboundMessage::user("hi")]))
            .unwrap();

        // RUN_STARTED, then the first STATE_DELTA(working).
        assert!(stream.next().await.is_some());
        assert!(stream.next().await.is_some());
        drop(stream);

        handle.await.unwrap();
        assert!(client.status_calls() < 5, "polled {} times", client.status_calls());
    }

    #[tokio::test]
    async fn test_validation_error_is_synchronous() {
        let client = Arc::new(ScriptedTaskClient::new());
        let orchestrator = RunOrchestrator::new(Arc::clone(&client) as _, polling());
        let err = orchestrator
            .execute(RunAgentInput {
                thread_id: Some("t1".into()),
                ..RunAgentInput::default()
            })
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingMessages);
        assert!(client.submit_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_run_id_is_used_everywhere() {
        let client = Arc::new(ScriptedTaskClient::new().then_completed_with(&[]));
        let orchestrator = RunOrchestrator::new(Arc::clone(&client) as _, polling());
        let mut req = input(vec![InboundMessage::user("hi")]);
        req.run_id = None;

        let stream = orchestrator.execute(req).unwrap();
        let run_id = stream.run_id().to_string();
        assert!(!run_id.is_empty());

        let chunks: Vec<_> = stream.collect().await;
        let body: String = chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        for frame in decode_frames(&body) {
            assert_eq!(frame.data["run_id"], run_id.as_str());
        }
        assert_eq!(client.submit_calls()[0].task_id, run_id);
    }

    struct PanickingClient;

    #[async_trait::async_trait]
    impl TaskClient for PanickingClient {
        async fn submit(
            &self,
            _thread_id: &str,
            _task_id: &str,
            _message_id: &str,
            _text: &str,
        ) -> Result<crate::a2a::TaskSnapshot, RemoteError> {
            panic!("agent client blew up")
        }

        async fn get_status(
            &self,
            _task_id: &str,
        ) -> Result<crate::a2a::TaskSnapshot, RemoteError> {
            panic!("agent client blew up")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_emits_internal_error_and_closes() {
        let orchestrator = RunOrchestrator::new(Arc::new(PanickingClient), polling());
        let (stream, handle) = orchestrator.launch(hi()).unwrap();

        let chunks: Vec<_> = stream.collect().await;
        let body: String = chunks
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        let frames = decode_frames(&body);

        assert_eq!(types(&frames), vec!["RUN_ERROR"]);
        assert_eq!(frames[0].data["error"]["code"], CODE_INTERNAL);
        assert!(handle.await.is_ok());
    }
}
