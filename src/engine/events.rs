//! Engine event types for UI communication

use crate::domain::{ExecutedStepRecord, Step, TerminalMarker};

/// Message sent to an observer while a run progresses
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A step began executing
    StepStarted { index: usize, step: Step },
    /// A step was attempted and its record appended
    StepFinished {
        index: usize,
        record: ExecutedStepRecord,
    },
    /// A wait step counted down one second
    WaitTick { index: usize, remaining: u64 },
    /// The closing record was appended
    Finished(TerminalMarker),
}
