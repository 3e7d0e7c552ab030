//! Single-writer output channel for one run's event stream.

use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::agui::{OutboundEvent, sse_frame};

/// Frames buffered between the run task and the HTTP body.
pub const DEFAULT_BUFFER: usize = 64;

/// Write end of a run stream.
///
/// Owned by the run task; `emit` takes `&mut self`, so at most one write is
/// in flight. A failed write means the consumer is gone: the sink closes
/// itself and every later call is a no-op.
#[derive(Debug)]
pub struct EventSink {
    tx: Option<mpsc::Sender<Bytes>>,
    terminal_sent: bool,
}

impl EventSink {
    /// Create a sink and the [`RunStream`] that reads from it.
    pub fn channel(
        buffer: usize,
        thread_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> (Self, RunStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let sink = Self {
            tx: Some(tx),
            terminal_sent: false,
        };
        let stream = RunStream {
            thread_id: thread_id.into(),
            run_id: run_id.into(),
            rx: ReceiverStream::new(rx),
        };
        (sink, stream)
    }

    /// Serialize `event` and append it to the stream, waiting for buffer
    /// space. Returns `false` if the event could not be delivered.
    pub async fn emit(&mut self, event: &OutboundEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        let frame = Bytes::from(sse_frame(event));
        if tx.send(frame).await.is_err() {
            tracing::debug!(
                event_type = event.event_type(),
                "Stream consumer disconnected; closing sink"
            );
            self.tx = None;
            return false;
        }

        if event.is_terminal() {
            self.terminal_sent = true;
        }
        true
    }

    /// Whether a write could still reach a consumer.
    pub fn is_open(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Whether a `RUN_FINISHED` or `RUN_ERROR` has been delivered.
    pub fn terminal_sent(&self) -> bool {
        self.terminal_sent
    }

    /// End the stream. Safe to call repeatedly and after a failed write.
    pub fn close(&mut self) {
        self.tx.take();
    }
}

/// Read end of a run stream: serialized SSE frames in emission order.
///
/// The stream ends once the run task closes its sink.
#[derive(Debug)]
pub struct RunStream {
    thread_id: String,
    run_id: String,
    rx: ReceiverStream<Bytes>,
}

impl RunStream {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl Stream for RunStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}
