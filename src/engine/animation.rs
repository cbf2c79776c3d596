//! Eased progress animation between two percentages

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};

use super::signal::StopSignal;
use super::lock;
use crate::domain::ExecutionState;

/// Ease-out cubic: fast start, gentle landing
#[inline]
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Progress value `elapsed` into an animation from `start` to `end`
pub fn progress_at(elapsed: Duration, start: f64, end: f64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return end;
    }
    let t = (elapsed.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0);
    if t >= 1.0 {
        return end;
    }
    start + (end - start) * ease_out_cubic(t)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    Finished,
    Cancelled,
}

/// Frame pacing for [`animate`]
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub duration: Duration,
    pub frame: Duration,
}

/// Publish eased progress samples into `state` on every frame.
///
/// With a stop signal the animation is abandoned on the first frame that sees
/// it raised; without one it always runs to `to`.
pub async fn animate(
    state: &Mutex<ExecutionState>,
    tween: Tween,
    stop: Option<&StopSignal>,
) -> AnimationOutcome {
    let started = Instant::now();
    let mut ticker = time::interval(tween.frame.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if stop.is_some_and(StopSignal::is_requested) {
            return AnimationOutcome::Cancelled;
        }

        let elapsed = started.elapsed();
        let percent = progress_at(elapsed, tween.from, tween.to, tween.duration);
        lock(state).set_progress(percent);

        if elapsed >= tween.duration {
            return AnimationOutcome::Finished;
        }
    }
}
