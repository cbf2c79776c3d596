//! Run command implementation

use anyhow::{Context, Result, bail};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use jetctl::config::Config;
use jetctl::engine::{EngineEvent, SequenceEngine};
use jetctl::sequence::SequenceFile;
use jetctl::{ErrorPolicy, TerminalMarker};

/// Run a sequence file until it completes, fails or is interrupted (Ctrl-C)
pub async fn run_command(
    config_path: Option<&Path>,
    file: &Path,
    continue_on_error: bool,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let sequence = SequenceFile::from_file(file)?;

    let policy = if continue_on_error {
        ErrorPolicy::ContinueOnError
    } else {
        sequence.policy_or(config.engine.error_policy)
    };

    let dispatcher = config.http_dispatcher();
    println!(
        "Running {} ({} steps, {}) against {}",
        if sequence.name.is_empty() {
            "sequence"
        } else {
            sequence.name.as_str()
        },
        sequence.steps.len(),
        policy,
        dispatcher.base_url()
    );

    let (tx, rx) = mpsc::channel();
    let engine = SequenceEngine::new(Arc::new(dispatcher), config.engine_timing()).with_events(tx);
    engine
        .start(sequence.steps.clone(), policy, config.step_limits())
        .with_context(|| format!("Cannot run {}", file.display()))?;

    let total = sequence.steps.len();
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut stopping = false;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c(), if !stopping => {
                result.context("Failed to listen for Ctrl-C")?;
                stopping = true;
                if engine.stop() {
                    eprintln!("Stopping...");
                }
            }
            _ = ticker.tick() => {}
        }

        for event in rx.try_iter() {
            print_event(&event, total);
        }
        if engine.snapshot().is_settled() {
            break;
        }
    }

    let state = engine.finished().await;
    for event in rx.try_iter() {
        print_event(&event, total);
    }

    let attempted = state.records().iter().filter(|r| !r.is_synthetic()).count();
    let failed = state
        .records()
        .iter()
        .filter(|r| !r.is_synthetic() && !r.success)
        .count();
    println!(
        "\n{} of {} steps attempted, {} failed",
        attempted, total, failed
    );

    match state.terminal_marker() {
        Some(TerminalMarker::Completed) => Ok(()),
        Some(marker) => bail!("Run ended: {}", marker),
        None => bail!("Run did not finish"),
    }
}

fn print_event(event: &EngineEvent, total: usize) {
    match event {
        EngineEvent::StepStarted { index, step } => {
            println!("[{}/{}] {}", index + 1, total, step.label());
        }
        EngineEvent::StepFinished { record, .. } => {
            println!("      {}", if record.success { "ok" } else { "FAILED" });
        }
        EngineEvent::WaitTick { remaining, .. } => {
            tracing::debug!("{}s remaining", remaining);
        }
        EngineEvent::Finished(marker) => {
            println!("{}", marker);
        }
    }
}
