//! The per-run step loop.
//!
//! One driver task executes one run. It never holds the state lock across an
//! await: every suspension point (dispatch, countdown, animation) observes the
//! run's stop signal instead.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use tokio::time;
use tracing::{debug, error, info, warn};

use super::animation::{AnimationOutcome, Tween, animate};
use super::countdown::{CountdownOutcome, countdown, wait_seconds};
use super::events::EngineEvent;
use super::signal::StopSignal;
use super::{EngineTiming, lock};
use crate::dispatch::Dispatcher;
use crate::domain::{
    ErrorPolicy, ExecutedStepRecord, ExecutionState, Step, StepCycle, StepKind, TerminalMarker,
    TransitionError,
};

/// How a single step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    Succeeded,
    Failed,
    /// Stopped or timed out; no record is written
    Interrupted,
}

pub(super) struct Driver {
    pub(super) dispatcher: Arc<dyn Dispatcher>,
    pub(super) timing: EngineTiming,
    pub(super) state: Arc<Mutex<ExecutionState>>,
    pub(super) events: Option<Sender<EngineEvent>>,
    pub(super) steps: Arc<[Step]>,
    pub(super) policy: ErrorPolicy,
    pub(super) stop: StopSignal,
}

impl Driver {
    /// Execute the run in a child task and settle the state if it dies
    pub(super) async fn run_supervised(self) {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let Err(e) = tokio::spawn(self.run()).await else {
            return;
        };

        error!("Run task ended abnormally: {}", e);
        let settled = lock(&state).settle_abandoned();
        if let Some(marker) = settled {
            info!("Run closed as {} after task failure", marker);
            if let Some(tx) = events {
                let _ = tx.send(EngineEvent::Finished(marker));
            }
        }
    }

    async fn run(self) {
        let marker = self.execute().await;
        self.finale(marker).await;
    }

    async fn execute(&self) -> TerminalMarker {
        let mut index = 0;
        loop {
            if self.stop.is_requested() {
                info!("Stop requested before step {}", index + 1);
                return TerminalMarker::Interrupted;
            }
            let Some(step) = self.steps.get(index) else {
                return TerminalMarker::Completed;
            };
            if step.is(StepKind::End) {
                info!("End step reached at step {}", index + 1);
                return TerminalMarker::Completed;
            }

            self.transition(|s| s.set_cycle(StepCycle::Dispatching));
            self.emit(EngineEvent::StepStarted {
                index,
                step: step.clone(),
            });
            debug!("Step {}/{}: {}", index + 1, self.steps.len(), step.label());

            let success = match self.execute_step(index, step).await {
                StepOutcome::Succeeded => true,
                StepOutcome::Failed => false,
                StepOutcome::Interrupted => return TerminalMarker::Interrupted,
            };

            self.transition(|s| s.record_step(step.clone(), success));
            self.emit(EngineEvent::StepFinished {
                index,
                record: ExecutedStepRecord::attempted(step.clone(), success),
            });

            if !success && self.policy == ErrorPolicy::BreakOnError {
                warn!("Step {} failed, stopping run", index + 1);
                return TerminalMarker::StoppedOnError;
            }

            let (from, to) = {
                let state = lock(&self.state);
                (state.percent_at(index), state.percent_at(index + 1))
            };
            let tween = Tween {
                from,
                to,
                duration: self.timing.animation,
                frame: self.timing.frame,
            };
            if animate(&self.state, tween, Some(&self.stop)).await == AnimationOutcome::Cancelled {
                return TerminalMarker::Interrupted;
            }

            self.transition(|s| s.set_cycle(StepCycle::Advancing));
            self.transition(|s| s.advance().map(|_| ()));
            index += 1;
        }
    }

    async fn execute_step(&self, index: usize, step: &Step) -> StepOutcome {
        match step.kind {
            Some(StepKind::Wait) => self.wait(index, step).await,
            _ => self.dispatch(index, step).await,
        }
    }

    async fn dispatch(&self, index: usize, step: &Step) -> StepOutcome {
        // The call runs in its own task so a panicking dispatcher only fails
        // this step
        let dispatcher = Arc::clone(&self.dispatcher);
        let owned = step.clone();
        let mut call = tokio::spawn(async move { dispatcher.dispatch(&owned).await });
        let abort = call.abort_handle();

        let joined = tokio::select! {
            biased;
            _ = self.stop.requested() => {
                abort.abort();
                return StepOutcome::Interrupted;
            }
            joined = time::timeout(self.timing.dispatch_timeout, &mut call) => joined,
        };

        let result = match joined {
            Err(_) => {
                abort.abort();
                warn!(
                    "Step {} ({}) timed out after {:?}; ending run as interrupted",
                    index + 1,
                    step.label(),
                    self.timing.dispatch_timeout
                );
                return StepOutcome::Interrupted;
            }
            Ok(Err(e)) => {
                error!(
                    "Step {} ({}): {} dispatcher task failed: {}",
                    index + 1,
                    step.label(),
                    self.dispatcher.name(),
                    e
                );
                return StepOutcome::Failed;
            }
            Ok(Ok(result)) => result,
        };

        match result {
            Ok(outcome) if outcome.success => StepOutcome::Succeeded,
            Ok(outcome) => {
                warn!(
                    "Step {} ({}) failed: {}",
                    index + 1,
                    step.label(),
                    outcome.message.as_deref().unwrap_or("device reported an error")
                );
                StepOutcome::Failed
            }
            Err(e) => {
                warn!(
                    "Step {} ({}) failed via {}: {:#}",
                    index + 1,
                    step.label(),
                    self.dispatcher.name(),
                    e
                );
                StepOutcome::Failed
            }
        }
    }

    async fn wait(&self, index: usize, step: &Step) -> StepOutcome {
        let Some(seconds) = step.numeric_value().and_then(wait_seconds) else {
            warn!("Step {}: wait value '{}' is not a duration", index + 1, step.value);
            return StepOutcome::Failed;
        };

        let outcome = countdown(seconds, self.timing.wait_tick, &self.stop, |remaining| {
            lock(&self.state).set_wait_remaining(Some(remaining));
            self.emit(EngineEvent::WaitTick { index, remaining });
        })
        .await;
        lock(&self.state).set_wait_remaining(None);

        match outcome {
            CountdownOutcome::Elapsed => StepOutcome::Succeeded,
            CountdownOutcome::Cancelled => StepOutcome::Interrupted,
        }
    }

    /// Enter the terminal phase, animate to 100 and append the closing record
    async fn finale(&self, marker: TerminalMarker) {
        self.transition(|s| s.begin_finale(marker));

        let from = lock(&self.state).progress_percent();
        let tween = Tween {
            from,
            to: 100.0,
            duration: self.timing.animation,
            frame: self.timing.frame,
        };
        animate(&self.state, tween, None).await;

        let finished = lock(&self.state).finish();
        match finished {
            Ok(marker) => {
                info!("Run finished: {}", marker);
                self.emit(EngineEvent::Finished(marker));
            }
            Err(e) => warn!("Failed to close run: {}", e),
        }
    }

    fn transition(&self, f: impl FnOnce(&mut ExecutionState) -> Result<(), TransitionError>) {
        let mut state = lock(&self.state);
        if let Err(e) = f(&mut *state) {
            warn!("Ignoring invalid state transition: {}", e);
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            // Observer may have gone away; the run continues regardless
            let _ = tx.send(event);
        }
    }
}
