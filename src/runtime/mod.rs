//! Per-run orchestration: identifiers, poll budget, output sink and the
//! background task that ties them together.

pub mod context;
pub mod orchestrator;
pub mod sink;

pub use context::{PollPlan, RunContext};
pub use orchestrator::RunOrchestrator;
pub use sink::{EventSink, RunStream};
