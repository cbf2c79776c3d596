//! Stopping runs: operator stop, dispatch timeout, idempotence

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use jetctl::sequence::StepLimits;
use jetctl::{AbortCause, ErrorPolicy, Phase, StepKind, TerminalMarker};

use crate::common::{
    Reply, ScriptedDispatcher, attempted, engine, run_to_end, step, step_with, stop_after,
};

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_wait_without_a_record() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![
        step(StepKind::MainGasOn),
        step_with(StepKind::Wait, "10"),
        step(StepKind::MainGasOff),
    ];
    engine
        .start(steps, ErrorPolicy::BreakOnError, StepLimits::default())
        .unwrap();

    // First step plus its 1 s animation, then 2.5 s into the countdown
    let stopper = stop_after(&engine, Duration::from_millis(3500));
    let started = Instant::now();
    let state = engine.finished().await;

    assert!(stopper.await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(state.phase(), Phase::Aborted);
    assert_eq!(state.abort_cause(), Some(AbortCause::Interrupted));
    assert!(state.stop_requested());
    assert_eq!(state.wait_remaining_seconds(), None);
    assert_eq!(attempted(&state), vec![(StepKind::MainGasOn, true)]);
    let closing = state.records().last().unwrap();
    assert_eq!(closing.terminal, Some(TerminalMarker::Interrupted));
    assert!(!closing.success);
    assert_eq!(state.progress_percent(), 100.0);
    assert_eq!(dispatcher.dispatched_kinds(), vec![StepKind::MainGasOn]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_abandons_in_flight_dispatch() {
    let dispatcher = Arc::new(
        ScriptedDispatcher::new()
            .reply(StepKind::PowerSupplyOff, Reply::Hang(Duration::from_secs(20))),
    );
    let engine = engine(&dispatcher);
    engine
        .start(
            vec![step(StepKind::PowerSupplyOff), step(StepKind::Dc1Off)],
            ErrorPolicy::ContinueOnError,
            StepLimits::default(),
        )
        .unwrap();

    stop_after(&engine, Duration::from_secs(2));
    let started = Instant::now();
    let state = engine.finished().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(state.abort_cause(), Some(AbortCause::Interrupted));
    assert!(attempted(&state).is_empty());
    assert_eq!(state.records().len(), 1);
    assert_eq!(dispatcher.dispatched_kinds(), vec![StepKind::PowerSupplyOff]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_progress_animation() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    engine
        .start(
            vec![step(StepKind::LaserOn), step(StepKind::LaserOff)],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();

    stop_after(&engine, Duration::from_millis(500));
    let state = engine.finished().await;

    assert_eq!(attempted(&state), vec![(StepKind::LaserOn, true)]);
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Interrupted));
    assert_eq!(dispatcher.dispatched_kinds(), vec![StepKind::LaserOn]);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_timeout_ends_run_interrupted() {
    let dispatcher = Arc::new(
        ScriptedDispatcher::new().reply(
            StepKind::SetHeaterTemperature,
            Reply::Hang(Duration::from_secs(120)),
        ),
    );
    let engine = engine(&dispatcher);
    let steps = vec![
        step_with(StepKind::SetHeaterTemperature, "300"),
        step(StepKind::HeaterOff),
    ];

    let started = Instant::now();
    let state = run_to_end(&engine, steps, ErrorPolicy::ContinueOnError).await;
    let took = started.elapsed();

    // 30 s ceiling plus the closing animation
    assert!(took >= Duration::from_secs(30));
    assert!(took < Duration::from_secs(35));
    assert_eq!(state.phase(), Phase::Aborted);
    assert_eq!(state.abort_cause(), Some(AbortCause::Interrupted));
    assert!(attempted(&state).is_empty(), "timeout must not leave a failure record");
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Interrupted));
    assert_eq!(
        dispatcher.dispatched_kinds(),
        vec![StepKind::SetHeaterTemperature]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    engine
        .start(
            vec![step_with(StepKind::Wait, "30")],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();

    assert!(engine.stop());
    assert!(!engine.stop());
    let state = engine.finished().await;

    let interrupted = state
        .records()
        .iter()
        .filter(|r| r.terminal == Some(TerminalMarker::Interrupted))
        .count();
    assert_eq!(interrupted, 1);
    assert_eq!(state.records().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_outside_a_run_does_nothing() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    assert!(!engine.stop());
    assert_eq!(engine.snapshot().phase(), Phase::Editing);

    let state = run_to_end(&engine, vec![step(StepKind::LaserOn)], ErrorPolicy::BreakOnError).await;
    assert!(!engine.stop());
    let after = engine.snapshot();
    assert_eq!(after.phase(), Phase::Completed);
    assert!(!after.stop_requested());
    assert_eq!(after.records(), state.records());
}

#[tokio::test(start_paused = true)]
async fn test_stop_three_seconds_into_ten_second_wait() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    engine
        .start(
            vec![step_with(StepKind::Wait, "10")],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();

    let stopper = stop_after(&engine, Duration::from_secs(3));
    let state = engine.finished().await;

    assert!(stopper.await.unwrap());
    assert!(
        !state
            .records()
            .iter()
            .any(|r| r.step.is(StepKind::Wait) && r.success)
    );
    assert_eq!(state.records().len(), 1);
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Interrupted));
    assert!(dispatcher.calls().is_empty());
}
