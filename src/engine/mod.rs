//! Sequence execution engine
//!
//! [`SequenceEngine`] owns the [`ExecutionState`] of one open sequence and
//! drives runs of it on the tokio runtime. Callers poll [`snapshot`] or
//! subscribe to [`EngineEvent`]s.
//!
//! [`snapshot`]: SequenceEngine::snapshot

mod animation;
mod countdown;
mod driver;
mod events;
mod signal;

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::domain::{ErrorPolicy, ExecutionState, Phase, Step, TransitionError};
use crate::sequence::{StepLimits, ValidationError, validate_sequence};
use driver::Driver;

pub use animation::{AnimationOutcome, Tween, animate, ease_out_cubic, progress_at};
pub use countdown::{CountdownOutcome, countdown, wait_seconds};
pub use events::EngineEvent;
pub use signal::StopSignal;

/// Timing knobs of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTiming {
    /// Ceiling for one dispatcher call; exceeding it ends the run interrupted
    pub dispatch_timeout: Duration,
    /// Length of each progress animation
    pub animation: Duration,
    /// Interval between progress samples
    pub frame: Duration,
    /// Countdown granularity of `wait` steps
    pub wait_tick: Duration,
}

impl Default for EngineTiming {
    fn default() -> Self {
        Self {
            dispatch_timeout: Duration::from_secs(30),
            animation: Duration::from_millis(1000),
            frame: Duration::from_millis(16),
            wait_tick: Duration::from_secs(1),
        }
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Cannot start a run while the sequence is {phase}")]
    NotEditing { phase: Phase },

    #[error("The current run has not finished (phase is {phase})")]
    NotSettled { phase: Phase },

    #[error("There is no previous run to restart")]
    NoPreviousRun,

    #[error("The sequence is already being edited")]
    AlreadyEditing,

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Inputs of a run, kept for `restart`
#[derive(Debug, Clone)]
struct RunPlan {
    steps: Arc<[Step]>,
    policy: ErrorPolicy,
    limits: StepLimits,
}

struct ActiveRun {
    plan: RunPlan,
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

/// Handle to the execution engine of one sequence.
///
/// Clones share the same state, so one clone can `stop` a run another clone
/// started (e.g. from a Ctrl-C handler).
#[derive(Clone)]
pub struct SequenceEngine {
    dispatcher: Arc<dyn Dispatcher>,
    timing: EngineTiming,
    events: Option<Sender<EngineEvent>>,
    state: Arc<Mutex<ExecutionState>>,
    // Lock order: `run` before `state`
    run: Arc<Mutex<Option<ActiveRun>>>,
}

impl SequenceEngine {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, timing: EngineTiming) -> Self {
        Self {
            dispatcher,
            timing,
            events: None,
            state: Arc::new(Mutex::new(ExecutionState::new())),
            run: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver [`EngineEvent`]s for every subsequent run to `tx`
    pub fn with_events(mut self, tx: Sender<EngineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn timing(&self) -> EngineTiming {
        self.timing
    }

    /// Copy of the current execution state
    pub fn snapshot(&self) -> ExecutionState {
        lock(&self.state).clone()
    }

    /// Validate `steps` and start running them.
    ///
    /// Requires the `Editing` phase. The steps are copied, so later edits do
    /// not affect the run. Must be called from within a tokio runtime.
    pub fn start(
        &self,
        steps: Vec<Step>,
        policy: ErrorPolicy,
        limits: StepLimits,
    ) -> Result<(), EngineError> {
        let mut run = lock(&self.run);
        let phase = lock(&self.state).phase();
        if phase != Phase::Editing {
            return Err(EngineError::NotEditing { phase });
        }

        if let Err(e) = validate_sequence(&steps, limits) {
            warn!("Sequence rejected: {}", e);
            return Err(e.into());
        }

        let plan = RunPlan {
            steps: steps.into(),
            policy,
            limits,
        };
        self.launch(&mut run, plan)
    }

    /// Request the running sequence to stop.
    ///
    /// Returns `true` if this call raised the stop flag. Repeated calls and
    /// calls outside `Running` do nothing.
    ///
    /// Cancellation is best-effort. A device call in flight is abandoned and
    /// its outcome ignored, but the request may already have reached the rig
    /// and changed its state. The same holds for a call that hits the dispatch
    /// timeout.
    pub fn stop(&self) -> bool {
        let run = lock(&self.run);
        match lock(&self.state).request_stop() {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                debug!("Stop ignored: {}", e);
                return false;
            }
        }
        if let Some(active) = run.as_ref() {
            active.stop.request();
        }
        info!("Stop requested");
        true
    }

    /// Run the previous step list again with the same policy and limits
    pub fn restart(&self) -> Result<(), EngineError> {
        let mut run = lock(&self.run);
        self.ensure_settled(EngineError::NoPreviousRun)?;
        let plan = run
            .as_ref()
            .map(|active| active.plan.clone())
            .ok_or(EngineError::NoPreviousRun)?;
        // The plan passed validation when it was first started
        debug!("Restarting with limits {:?}", plan.limits);
        self.launch(&mut run, plan)
    }

    /// Discard the finished run and go back to `Editing`
    pub fn return_to_editing(&self) -> Result<(), EngineError> {
        let mut run = lock(&self.run);
        self.ensure_settled(EngineError::AlreadyEditing)?;
        lock(&self.state).reset();
        *run = None;
        info!("Returned to editing");
        Ok(())
    }

    /// Wait for the current run's driver task and return the final state
    pub async fn finished(&self) -> ExecutionState {
        let handle = lock(&self.run).as_mut().and_then(|active| active.handle.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Run task ended abnormally: {}", e);
            }
        }
        self.snapshot()
    }

    /// Require a finished run; `editing` is the error while no run exists
    fn ensure_settled(&self, editing: EngineError) -> Result<(), EngineError> {
        let state = lock(&self.state);
        match state.phase() {
            _ if state.is_settled() => Ok(()),
            Phase::Editing => Err(editing),
            phase => Err(EngineError::NotSettled { phase }),
        }
    }

    fn launch(&self, slot: &mut Option<ActiveRun>, plan: RunPlan) -> Result<(), EngineError> {
        let run_id = lock(&self.state).begin(plan.steps.len(), plan.policy)?;
        info!(
            "Starting run {} ({} steps, {})",
            run_id,
            plan.steps.len(),
            plan.policy
        );

        let stop = StopSignal::new();
        let driver = Driver {
            dispatcher: Arc::clone(&self.dispatcher),
            timing: self.timing,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
            steps: Arc::clone(&plan.steps),
            policy: plan.policy,
            stop: stop.clone(),
        };
        let handle = tokio::spawn(driver.run_supervised());

        *slot = Some(ActiveRun {
            plan,
            stop,
            handle: Some(handle),
        });
        Ok(())
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
