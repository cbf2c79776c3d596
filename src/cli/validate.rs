//! Validate command implementation

use anyhow::{Result, bail};
use std::path::Path;

use jetctl::config::Config;
use jetctl::sequence::{SequenceFile, validate_sequence};

/// Check a sequence file against the pre-run rules
pub fn validate_command(config_path: Option<&Path>, file: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let sequence = SequenceFile::from_file(file)?;

    if let Err(e) = validate_sequence(&sequence.steps, config.step_limits()) {
        let step = &sequence.steps[e.index()];
        bail!("{}: {}\n  -> {}", file.display(), e, step.label());
    }

    let name = if sequence.name.is_empty() {
        file.display().to_string()
    } else {
        sequence.name.clone()
    };
    println!("{}: {} steps OK", name, sequence.steps.len());
    Ok(())
}
