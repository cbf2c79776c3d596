//! Step list editing with inline numeric guards.
//!
//! Guards reject an update and leave the list untouched; the rejection carries
//! the message the operator sees next to the field.

use thiserror::Error;
use tracing::debug;

use super::validate::{
    LaserPowerError, StepLimits, ValidationError, VoltageError, check_laser_power, check_voltage,
    parse_number, validate_sequence,
};
use crate::domain::{Step, StepKind};

/// Why an edit was not applied
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditRejection {
    #[error("Step {index} does not exist (sequence has {len} steps)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    LaserPower(#[from] LaserPowerError),

    #[error(transparent)]
    Voltage(#[from] VoltageError),

    #[error("{kind} expects a number, got '{value}'")]
    NotANumber { kind: StepKind, value: String },
}

/// Ordered, editable list of steps.
///
/// Only used while a sequence is in the editing phase. Starting a run hands
/// the engine a copy of [`steps`](Self::steps), so later edits never reach a
/// running sequence.
#[derive(Debug, Clone, Default)]
pub struct SequenceEditor {
    steps: Vec<Step>,
    limits: StepLimits,
}

impl SequenceEditor {
    pub fn new(limits: StepLimits) -> Self {
        Self {
            steps: Vec::new(),
            limits,
        }
    }

    pub fn with_steps(steps: Vec<Step>, limits: StepLimits) -> Self {
        Self { steps, limits }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn limits(&self) -> StepLimits {
        self.limits
    }

    /// Device flags can change while editing (e.g. the laser reconnects)
    pub fn set_limits(&mut self, limits: StepLimits) {
        self.limits = limits;
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Append an empty row
    pub fn add_step(&mut self) -> usize {
        self.steps.push(Step::empty());
        self.steps.len() - 1
    }

    /// Replace the step at `index` if the new value passes the inline guards
    pub fn update_step(
        &mut self,
        index: usize,
        kind: Option<StepKind>,
        value: impl Into<String>,
    ) -> Result<(), EditRejection> {
        let len = self.steps.len();
        if index >= len {
            return Err(EditRejection::IndexOutOfRange { index, len });
        }

        let candidate = Step {
            kind,
            value: value.into(),
        };
        if let Err(rejection) = self.check_inline(&candidate) {
            debug!("Rejected edit of step {}: {}", index, rejection);
            return Err(rejection);
        }

        self.steps[index] = candidate;
        Ok(())
    }

    pub fn remove_step(&mut self, index: usize) -> Result<Step, EditRejection> {
        let len = self.steps.len();
        if index >= len {
            return Err(EditRejection::IndexOutOfRange { index, len });
        }
        Ok(self.steps.remove(index))
    }

    /// Run the pre-start rules over the current list
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_sequence(&self.steps, self.limits)
    }

    fn check_inline(&self, step: &Step) -> Result<(), EditRejection> {
        let Some(kind) = step.kind else {
            return Ok(());
        };
        // The operator picks the action first and types the value afterwards
        if !step.has_value() {
            return Ok(());
        }

        match kind {
            StepKind::SetLaserPower => {
                check_laser_power(&step.value, self.limits)?;
            }
            StepKind::SetPowerSupplyVoltage => {
                check_voltage(&step.value)?;
            }
            _ if kind.needs_value() => {
                if parse_number(&step.value).is_none() {
                    return Err(EditRejection::NotANumber {
                        kind,
                        value: step.value.clone(),
                    });
                }
            }
            _ => {}
        }
        Ok(())
    }
}
