//! Execution state of one open sequence.
//!
//! `ExecutionState` is a plain value with pure transition methods. It does no
//! I/O and reads no clock besides stamping `started_at`/`finished_at`, so the
//! lifecycle can be tested without a runtime. The engine owns one instance
//! behind a mutex and UIs read copies of it via `SequenceEngine::snapshot`.
//!
//! # Phase Flow
//!
//! ```text
//! Editing
//!    ↓ begin
//! Running ──(per step: Dispatching → Succeeded | Failed → Advancing)
//!    ↓ begin_finale
//! Completed | Aborted (finale: progress animates to 100)
//!    ↓ finish (synthetic record appended, run settled)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{ExecutedStepRecord, Step, TerminalMarker};

/// Lifecycle phase of a sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Editing,
    Running,
    Completed,
    Aborted,
}

impl Phase {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Aborted)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Editing => "editing",
            Phase::Running => "running",
            Phase::Completed => "completed",
            Phase::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an aborted run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortCause {
    Interrupted,
    StepFailed,
}

/// Sub-state of the step currently being executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCycle {
    Dispatching,
    Succeeded,
    Failed,
    Advancing,
}

/// What a run does after a step fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    ContinueOnError,
    #[default]
    BreakOnError,
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::ContinueOnError => write!(f, "continue-on-error"),
            ErrorPolicy::BreakOnError => write!(f, "break-on-error"),
        }
    }
}

/// Rejected state transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No run in progress (phase is {phase})")]
    NotRunning { phase: Phase },

    #[error("A run is already in progress")]
    RunInProgress,

    #[error("Step index {index} is out of range for {len} steps")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("The run has no pending end marker")]
    NoPendingFinale,

    #[error("The run is still finishing")]
    FinaleInProgress,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionState {
    phase: Phase,
    abort_cause: Option<AbortCause>,
    step_cycle: Option<StepCycle>,
    current_index: usize,
    step_count: usize,
    progress_percent: f64,
    stop_requested: bool,
    wait_remaining_seconds: Option<u64>,
    error_policy: ErrorPolicy,
    records: Vec<ExecutedStepRecord>,
    run_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pending_marker: Option<TerminalMarker>,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn abort_cause(&self) -> Option<AbortCause> {
        self.abort_cause
    }

    #[inline]
    pub fn step_cycle(&self) -> Option<StepCycle> {
        self.step_cycle
    }

    #[inline]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[inline]
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    #[inline]
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    #[inline]
    pub fn wait_remaining_seconds(&self) -> Option<u64> {
        self.wait_remaining_seconds
    }

    #[inline]
    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn records(&self) -> &[ExecutedStepRecord] {
        &self.records
    }

    pub fn run_id(&self) -> Option<Uuid> {
        self.run_id
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Marker of the synthetic record that closed the run, if it has closed
    pub fn terminal_marker(&self) -> Option<TerminalMarker> {
        self.records.last().and_then(|r| r.terminal)
    }

    /// Terminal and the closing record has been appended
    pub fn is_settled(&self) -> bool {
        self.phase.is_terminal() && self.pending_marker.is_none()
    }

    /// Progress at the start of step `index` for the current run
    pub fn percent_at(&self, index: usize) -> f64 {
        if self.step_count == 0 {
            return 100.0;
        }
        (index.min(self.step_count) as f64 / self.step_count as f64) * 100.0
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    /// Enter `Running` for a fresh run of `step_count` steps.
    ///
    /// Allowed from `Editing` and from a settled terminal state (restart).
    pub fn begin(
        &mut self,
        step_count: usize,
        policy: ErrorPolicy,
    ) -> Result<Uuid, TransitionError> {
        if self.phase == Phase::Running {
            return Err(TransitionError::RunInProgress);
        }
        if self.pending_marker.is_some() {
            return Err(TransitionError::FinaleInProgress);
        }

        let run_id = Uuid::new_v4();
        *self = Self {
            phase: Phase::Running,
            step_count,
            error_policy: policy,
            run_id: Some(run_id),
            started_at: Some(Utc::now()),
            ..Self::default()
        };
        Ok(run_id)
    }

    pub fn set_cycle(&mut self, cycle: StepCycle) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.step_cycle = Some(cycle);
        Ok(())
    }

    /// Append the record for an attempted step and move the cycle to
    /// `Succeeded` or `Failed`
    pub fn record_step(&mut self, step: Step, success: bool) -> Result<(), TransitionError> {
        self.ensure_running()?;
        self.records.push(ExecutedStepRecord::attempted(step, success));
        self.step_cycle = Some(if success {
            StepCycle::Succeeded
        } else {
            StepCycle::Failed
        });
        Ok(())
    }

    /// Move to the next step
    pub fn advance(&mut self) -> Result<usize, TransitionError> {
        self.ensure_running()?;
        if self.current_index >= self.step_count {
            return Err(TransitionError::IndexOutOfRange {
                index: self.current_index + 1,
                len: self.step_count,
            });
        }
        self.current_index += 1;
        self.step_cycle = None;
        Ok(self.current_index)
    }

    /// Publish a progress sample.
    ///
    /// Samples are clamped to `[0, 100]` and never lower the current value
    /// within a run. Returns the stored value.
    pub fn set_progress(&mut self, percent: f64) -> f64 {
        if !self.phase.is_terminal() && self.phase != Phase::Running {
            return self.progress_percent;
        }
        let clamped = if percent.is_nan() {
            self.progress_percent
        } else {
            percent.clamp(0.0, 100.0)
        };
        if clamped > self.progress_percent {
            self.progress_percent = clamped;
        }
        self.progress_percent
    }

    pub fn set_wait_remaining(&mut self, remaining: Option<u64>) {
        self.wait_remaining_seconds = remaining;
    }

    /// Flag the run for stopping. Returns `true` the first time.
    pub fn request_stop(&mut self) -> Result<bool, TransitionError> {
        self.ensure_running()?;
        if self.stop_requested {
            return Ok(false);
        }
        self.stop_requested = true;
        Ok(true)
    }

    /// Enter the terminal phase for `marker`; the closing record follows in
    /// [`finish`](Self::finish) once the final progress animation is done.
    ///
    /// A run that would complete after a stop was acknowledged closes as
    /// interrupted instead.
    pub fn begin_finale(&mut self, marker: TerminalMarker) -> Result<(), TransitionError> {
        self.ensure_running()?;
        let marker = match marker {
            TerminalMarker::Completed if self.stop_requested => TerminalMarker::Interrupted,
            other => other,
        };
        let (phase, cause) = match marker {
            TerminalMarker::Completed => (Phase::Completed, None),
            TerminalMarker::StoppedOnError => (Phase::Aborted, Some(AbortCause::StepFailed)),
            TerminalMarker::Interrupted => (Phase::Aborted, Some(AbortCause::Interrupted)),
        };
        self.phase = phase;
        self.abort_cause = cause;
        self.step_cycle = None;
        self.wait_remaining_seconds = None;
        self.pending_marker = Some(marker);
        Ok(())
    }

    /// Append the synthetic record and settle the run
    pub fn finish(&mut self) -> Result<TerminalMarker, TransitionError> {
        let marker = self
            .pending_marker
            .take()
            .ok_or(TransitionError::NoPendingFinale)?;
        self.progress_percent = 100.0;
        self.records.push(ExecutedStepRecord::terminal(marker));
        self.finished_at = Some(Utc::now());
        Ok(marker)
    }

    /// Close a run whose driver went away, skipping the final animation.
    ///
    /// A running state closes as interrupted; a pending finale keeps its
    /// marker. Returns `None` when there is nothing to close.
    pub fn settle_abandoned(&mut self) -> Option<TerminalMarker> {
        if self.phase == Phase::Running {
            self.begin_finale(TerminalMarker::Interrupted).ok()?;
        }
        self.finish().ok()
    }

    /// Drop all run state and return to `Editing`
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn ensure_running(&self) -> Result<(), TransitionError> {
        if self.phase == Phase::Running {
            Ok(())
        } else {
            Err(TransitionError::NotRunning { phase: self.phase })
        }
    }
}
