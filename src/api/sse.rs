use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use std::convert::Infallible;

use crate::runtime::RunStream;

/// Adapt a run's frames into an HTTP body stream.
pub fn sse_body_stream(
    mut stream: RunStream,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        while let Some(chunk) = stream.next().await {
            yield Ok::<Bytes, Infallible>(chunk);
        }
        tracing::debug!(
            thread_id = stream.thread_id(),
            run_id = stream.run_id(),
            "Run stream drained"
        );
    }
}

/// Wrap an SSE body stream in a streaming response.
pub fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    // Disable proxy buffering (nginx).
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    (headers, Body::from_stream(stream)).into_response()
}
