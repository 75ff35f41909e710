//! Recording engine: pre/post dispatch hooks and single-flight coordination

mod coordinator;
mod engine;

pub use coordinator::{Claim, Coordinator, RecordingGuard};
pub use engine::{Decision, RecordTicket, Recorder};
