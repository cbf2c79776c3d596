//! Progress reporting and engine events

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use jetctl::engine::{EngineEvent, EngineTiming, SequenceEngine};
use jetctl::sequence::StepLimits;
use jetctl::{ErrorPolicy, ExecutedStepRecord, Step, StepKind, TerminalMarker};

use crate::common::{Reply, ScriptedDispatcher, step, step_with};

#[tokio::test(start_paused = true)]
async fn test_progress_never_decreases() {
    let dispatcher = Arc::new(ScriptedDispatcher::new().reply(StepKind::LaserOff, Reply::Fail));
    let engine = crate::common::engine(&dispatcher);
    let steps = vec![
        step(StepKind::LaserOn),
        step_with(StepKind::Wait, "1.5"),
        step(StepKind::LaserOff),
        step(StepKind::UltrasonicOff),
    ];
    engine
        .start(steps, ErrorPolicy::ContinueOnError, StepLimits::default())
        .unwrap();

    let sampler = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut samples = Vec::new();
            loop {
                let state = engine.snapshot();
                samples.push(state.progress_percent());
                if state.is_settled() {
                    return samples;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    engine.finished().await;
    let samples = sampler.await.unwrap();

    assert!(samples.len() > 100);
    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "progress went backwards");
    assert!(samples.iter().all(|p| (0.0..=100.0).contains(p)));
    assert_eq!(*samples.last().unwrap(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_lands_on_step_boundaries() {
    let dispatcher = Arc::new(
        ScriptedDispatcher::new().reply(StepKind::MainGasOff, Reply::Hang(Duration::from_secs(10))),
    );
    let engine = crate::common::engine(&dispatcher);
    let steps = vec![
        step(StepKind::MainGasOn),
        step(StepKind::MainGasFullOpen),
        step(StepKind::MainGasOff),
        step(StepKind::LaserOff),
    ];
    engine
        .start(steps, ErrorPolicy::BreakOnError, StepLimits::default())
        .unwrap();

    // Two steps done and animated, third still dispatching
    tokio::time::sleep(Duration::from_secs(5)).await;
    let state = engine.snapshot();
    assert_eq!(state.current_index(), 2);
    assert_eq!(state.progress_percent(), 50.0);

    engine.finished().await;
}

#[tokio::test(start_paused = true)]
async fn test_wait_publishes_remaining_seconds() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = crate::common::engine(&dispatcher);
    engine
        .start(
            vec![step_with(StepKind::Wait, "5")],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(engine.snapshot().wait_remaining_seconds(), Some(3));

    let state = engine.finished().await;
    assert_eq!(state.wait_remaining_seconds(), None);
}

#[tokio::test(start_paused = true)]
async fn test_events_follow_the_run() {
    let (tx, rx) = mpsc::channel();
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = SequenceEngine::new(dispatcher.clone(), EngineTiming::default()).with_events(tx);
    let wait = step_with(StepKind::Wait, "1.2");
    let laser = step(StepKind::LaserOn);

    engine
        .start(
            vec![wait.clone(), laser.clone()],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();
    engine.finished().await;

    let events: Vec<EngineEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            EngineEvent::StepStarted {
                index: 0,
                step: wait.clone()
            },
            EngineEvent::WaitTick {
                index: 0,
                remaining: 2
            },
            EngineEvent::WaitTick {
                index: 0,
                remaining: 1
            },
            EngineEvent::WaitTick {
                index: 0,
                remaining: 0
            },
            EngineEvent::StepFinished {
                index: 0,
                record: ExecutedStepRecord::attempted(wait, true)
            },
            EngineEvent::StepStarted {
                index: 1,
                step: laser.clone()
            },
            EngineEvent::StepFinished {
                index: 1,
                record: ExecutedStepRecord::attempted(laser, true)
            },
            EngineEvent::Finished(TerminalMarker::Completed),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_custom_timing_is_honored() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let timing = EngineTiming {
        animation: Duration::from_millis(200),
        ..EngineTiming::default()
    };
    let engine = SequenceEngine::new(dispatcher, timing);
    let steps: Vec<Step> = (0..5).map(|_| step(StepKind::UltrasonicOn)).collect();

    let started = tokio::time::Instant::now();
    engine
        .start(steps, ErrorPolicy::BreakOnError, StepLimits::default())
        .unwrap();
    let state = engine.finished().await;

    // Five step animations plus the closing one
    let took = started.elapsed();
    assert!(took >= Duration::from_millis(1200));
    assert!(took < Duration::from_millis(1500));
    assert_eq!(state.records().len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_zero_wait_tick_still_settles() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let timing = EngineTiming {
        wait_tick: Duration::ZERO,
        ..EngineTiming::default()
    };
    let engine = SequenceEngine::new(dispatcher, timing);

    engine
        .start(
            vec![step_with(StepKind::Wait, "2")],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();
    let state = engine.finished().await;

    assert!(state.is_settled());
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Completed));
    assert_eq!(state.records().len(), 2);
    assert!(state.records()[0].success);
}
