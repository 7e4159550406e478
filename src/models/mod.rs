//! Domain model module declarations.

pub mod engine;
pub mod event;
pub mod phase;
pub mod prompt;
pub mod run;
pub mod session;

pub use engine::{EngineCapabilities, EngineId, Transport};
pub use event::{EventKind, RawEvent, StreamEvent};
pub use phase::RunPhase;
pub use prompt::{PromptRef, PromptSource};
pub use run::{RunOpts, RunResult, EXIT_INTERRUPTED, EXIT_NOT_FOUND};
pub use session::SessionRecord;
