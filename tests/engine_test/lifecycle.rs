//! Run lifecycle: start, step records, closing record, phase errors

use std::sync::Arc;

use jetctl::engine::EngineError;
use jetctl::sequence::{StepLimits, ValidationError};
use jetctl::{ErrorPolicy, Phase, StepKind, TerminalMarker};

use crate::common::{Reply, ScriptedDispatcher, attempted, engine, run_to_end, step, step_with};

#[tokio::test(start_paused = true)]
async fn test_successful_run_records_every_step_in_order() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![
        step(StepKind::MainGasFullOpen),
        step_with(StepKind::SetLaserPower, "40"),
        step(StepKind::LaserOn),
        step(StepKind::LaserOff),
    ];

    let state = run_to_end(&engine, steps.clone(), ErrorPolicy::BreakOnError).await;

    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.abort_cause(), None);
    assert_eq!(state.progress_percent(), 100.0);
    assert_eq!(state.records().len(), steps.len() + 1);
    for (record, step) in state.records().iter().zip(&steps) {
        assert_eq!(&record.step, step);
        assert!(record.success);
    }
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Completed));
    assert!(state.records().last().unwrap().success);
    assert_eq!(dispatcher.calls(), steps);
    assert!(state.finished_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_empty_sequence_completes_with_closing_record() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);

    let state = run_to_end(&engine, Vec::new(), ErrorPolicy::BreakOnError).await;

    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(state.records().len(), 1);
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Completed));
    assert_eq!(state.progress_percent(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_and_end_never_reach_the_dispatcher() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![
        step(StepKind::LaserOn),
        step_with(StepKind::Wait, "2"),
        step(StepKind::LaserOff),
    ];

    let state = run_to_end(&engine, steps, ErrorPolicy::BreakOnError).await;

    assert_eq!(
        dispatcher.dispatched_kinds(),
        vec![StepKind::LaserOn, StepKind::LaserOff]
    );
    assert_eq!(
        attempted(&state),
        vec![
            (StepKind::LaserOn, true),
            (StepKind::Wait, true),
            (StepKind::LaserOff, true),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_end_step_completes_the_run_early() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![
        step(StepKind::LaserOn),
        step(StepKind::End),
        step(StepKind::LaserOff),
    ];

    let state = run_to_end(&engine, steps, ErrorPolicy::BreakOnError).await;

    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(dispatcher.dispatched_kinds(), vec![StepKind::LaserOn]);
    assert_eq!(attempted(&state), vec![(StepKind::LaserOn, true)]);
    assert_eq!(state.terminal_marker(), Some(TerminalMarker::Completed));
    assert_eq!(state.progress_percent(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_sequence_does_not_start() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![step(StepKind::PowerSupplyOn), step(StepKind::MainGasFullOpen)];

    let err = engine
        .start(steps, ErrorPolicy::BreakOnError, StepLimits::default())
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::FullOpenRequiredBeforePowerOn { index: 0 })
    ));
    assert!(err.to_string().contains("full open main gas required before power on"));
    let state = engine.snapshot();
    assert_eq!(state.phase(), Phase::Editing);
    assert!(state.records().is_empty());
    assert!(dispatcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_laser_limit_comes_from_start_limits() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    let steps = vec![step_with(StepKind::SetLaserPower, "96")];

    let limited = StepLimits {
        max_pwm_limited: true,
    };
    assert!(matches!(
        engine.start(steps.clone(), ErrorPolicy::BreakOnError, limited),
        Err(EngineError::Validation(ValidationError::LaserPower { index: 0, .. }))
    ));

    engine
        .start(steps, ErrorPolicy::BreakOnError, StepLimits::default())
        .unwrap();
    assert_eq!(engine.finished().await.phase(), Phase::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_start_while_running_is_rejected() {
    let dispatcher = Arc::new(
        ScriptedDispatcher::new()
            .reply(StepKind::LaserOn, Reply::Hang(std::time::Duration::from_secs(5))),
    );
    let engine = engine(&dispatcher);
    engine
        .start(
            vec![step(StepKind::LaserOn)],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap();

    let err = engine
        .start(
            vec![step(StepKind::LaserOff)],
            ErrorPolicy::BreakOnError,
            StepLimits::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotEditing { phase: Phase::Running }));

    assert!(matches!(
        engine.restart(),
        Err(EngineError::NotSettled { phase: Phase::Running })
    ));
    assert!(matches!(
        engine.return_to_editing(),
        Err(EngineError::NotSettled { phase: Phase::Running })
    ));

    let state = engine.finished().await;
    assert_eq!(state.phase(), Phase::Completed);
    assert_eq!(dispatcher.dispatched_kinds(), vec![StepKind::LaserOn]);
}

#[tokio::test(start_paused = true)]
async fn test_start_from_terminal_phase_is_rejected() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    run_to_end(&engine, vec![step(StepKind::LaserOn)], ErrorPolicy::BreakOnError).await;

    assert!(matches!(
        engine.start(
            vec![step(StepKind::LaserOn)],
            ErrorPolicy::BreakOnError,
            StepLimits::default()
        ),
        Err(EngineError::NotEditing {
            phase: Phase::Completed
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_each_run_gets_a_run_id() {
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = engine(&dispatcher);
    assert!(engine.snapshot().run_id().is_none());

    let state = run_to_end(
        &engine,
        vec![step(StepKind::HeaterOff)],
        ErrorPolicy::BreakOnError,
    )
    .await;
    assert!(state.run_id().is_some());
    assert!(state.started_at().unwrap() <= state.finished_at().unwrap());
}
