//! Inbound side of the bridge: the run request and the typed event stream.

pub mod events;
pub mod request;
pub mod sse;

pub use events::{EventKind, EventTranslator, OutboundEvent, Role};
pub use request::{InboundMessage, RunAgentInput, RunOverrides, ValidatedRun, ValidationError};
pub use sse::{Frame, decode_frames, sse_frame};
