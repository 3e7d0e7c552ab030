//! Server-sent-event framing for run events.
//!
//! Each event becomes one frame:
//!
//! ```text
//! event: STATE_DELTA
//! data: {"type":"STATE_DELTA","delta":{"bindu_state":"working"},...}
//!
//! ```

use super::events::OutboundEvent;

/// Encode one event as an SSE frame (`event:` line, `data:` line, blank line).
pub fn sse_frame(event: &OutboundEvent) -> String {
    let event_name = event.event_type();
    let json = serde_json::to_string(event).unwrap_or_else(|e| {
        serde_json::json!({
            "type": "RUN_ERROR",
            "thread_id": event.thread_id,
            "run_id": event.run_id,
            "timestamp": event.timestamp,
            "error": { "message": e.to_string() }
        })
        .to_string()
    });

    format!("event: {event_name}\ndata: {json}\n\n")
}

/// A decoded frame: the `event:` name and the parsed `data:` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub data: serde_json::Value,
}

/// Split an SSE body into frames. Frames without a parsable `data:` line
/// are skipped.
pub fn decode_frames(body: &str) -> Vec<Frame> {
    body.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(rest) = line.strip_prefix("event:") {
                    event = Some(rest.trim().to_string());
                } else if let Some(rest) = line.strip_prefix("data:") {
                    data = serde_json::from_str(rest.trim()).ok();
                }
            }
            Some(Frame {
                event: event.unwrap_or_else(|| "message".to_string()),
                data: data?,
            })
        })
        .collect()
}
