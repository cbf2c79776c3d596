use serde::{Deserialize, Serialize};

use super::{Step, StepKind};

/// How a run ended, carried by the synthetic record appended last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalMarker {
    /// Every step was attempted (or an `end` step was reached)
    Completed,
    /// A step failed under break-on-error
    StoppedOnError,
    /// The operator stopped the run, or a dispatch timed out
    Interrupted,
}

impl TerminalMarker {
    /// Whether the synthetic record is flagged as a success
    pub const fn is_success(self) -> bool {
        matches!(self, TerminalMarker::Completed)
    }

    pub const fn description(self) -> &'static str {
        match self {
            TerminalMarker::Completed => "End",
            TerminalMarker::StoppedOnError => "End - stopped due to error",
            TerminalMarker::Interrupted => "End - interrupted",
        }
    }
}

impl std::fmt::Display for TerminalMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// One entry of the run history.
///
/// Records hold no timestamps so that two runs fed the same dispatcher
/// responses produce equal histories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedStepRecord {
    pub step: Step,
    pub success: bool,
    /// Set only on the synthetic record closing a run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<TerminalMarker>,
}

impl ExecutedStepRecord {
    pub fn attempted(step: Step, success: bool) -> Self {
        Self {
            step,
            success,
            terminal: None,
        }
    }

    pub fn terminal(marker: TerminalMarker) -> Self {
        Self {
            step: Step::action(StepKind::End),
            success: marker.is_success(),
            terminal: Some(marker),
        }
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.terminal.is_some()
    }

    pub fn label(&self) -> String {
        match self.terminal {
            Some(marker) => marker.description().to_string(),
            None => self.step.label(),
        }
    }
}
