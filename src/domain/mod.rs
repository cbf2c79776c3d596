//! Core domain types for jetctl

mod record;
mod state;
mod step;

pub use record::{ExecutedStepRecord, TerminalMarker};
pub use state::{AbortCause, ErrorPolicy, ExecutionState, Phase, StepCycle, TransitionError};
pub use step::{Step, StepKind, StepKindInfo};
