//! Whole-second countdown used by `wait` steps

use std::time::Duration;

use tokio::time::{self, Instant};

use super::signal::StopSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Elapsed,
    Cancelled,
}

/// Seconds a wait value counts down from. Fractions round up.
pub fn wait_seconds(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.ceil() as u64)
}

/// Count down from `seconds`, reporting the remaining count on every tick.
///
/// `on_tick` sees `seconds`, `seconds - 1`, ... `0`. A raised stop signal
/// ends the countdown at once without reporting zero. `tick` is at least 1 ms.
pub async fn countdown(
    seconds: u64,
    tick: Duration,
    stop: &StopSignal,
    mut on_tick: impl FnMut(u64),
) -> CountdownOutcome {
    let tick = tick.max(Duration::from_millis(1));
    let mut ticker = time::interval_at(Instant::now() + tick, tick);
    let mut remaining = seconds;

    loop {
        if stop.is_requested() {
            return CountdownOutcome::Cancelled;
        }
        on_tick(remaining);
        if remaining == 0 {
            return CountdownOutcome::Elapsed;
        }

        tokio::select! {
            biased;
            _ = stop.requested() => return CountdownOutcome::Cancelled,
            _ = ticker.tick() => {}
        }
        remaining -= 1;
    }
}
