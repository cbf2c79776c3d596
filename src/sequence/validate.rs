//! Pre-run safety validation.
//!
//! Rules are applied in a fixed priority order and each rule scans the whole
//! sequence before the next one runs, so the reported violation is always the
//! highest-priority one present.

use thiserror::Error;

use crate::domain::{Step, StepKind};

/// Laser ceiling when the controller caps PWM at 95 %
pub const LIMITED_MAX_LASER_POWER: f64 = 95.0;
/// Laser ceiling otherwise
pub const MAX_LASER_POWER: f64 = 99.0;

/// Device context the numeric guards depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepLimits {
    /// Laser controller reports its max PWM is limited to 95 %
    pub max_pwm_limited: bool,
}

impl StepLimits {
    pub fn max_laser_power(&self) -> f64 {
        if self.max_pwm_limited {
            LIMITED_MAX_LASER_POWER
        } else {
            MAX_LASER_POWER
        }
    }
}

/// Why a laser power value is not acceptable
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum LaserPowerError {
    #[error("power exceeds limit ({limit}%)")]
    ExceedsLimit { limit: f64 },

    #[error("power must be a multiple of 0.5")]
    NotHalfStep,

    #[error("power must be a number")]
    NotANumber,
}

/// Check a laser power value against the ceiling and the 0.5 % grid
pub fn check_laser_power(value: &str, limits: StepLimits) -> Result<f64, LaserPowerError> {
    let power = parse_number(value).ok_or(LaserPowerError::NotANumber)?;
    let limit = limits.max_laser_power();
    if power > limit || power < 0.0 {
        return Err(LaserPowerError::ExceedsLimit { limit });
    }
    let doubled = power * 2.0;
    if (doubled - doubled.round()).abs() > 1e-9 {
        return Err(LaserPowerError::NotHalfStep);
    }
    Ok(power)
}

/// Check that a power supply voltage is a whole number of volts
pub fn check_voltage(value: &str) -> Result<i64, VoltageError> {
    let voltage = parse_number(value).ok_or(VoltageError::NotANumber)?;
    if voltage.fract() != 0.0 {
        return Err(VoltageError::NotInteger);
    }
    Ok(voltage as i64)
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoltageError {
    #[error("voltage must be an integer")]
    NotInteger,

    #[error("voltage must be a number")]
    NotANumber,
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// First rule violation found in a sequence
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Step {}: no action selected", .index + 1)]
    MissingKind { index: usize },

    #[error("Step {} ({kind}): a value is required", .index + 1)]
    MissingValue { index: usize, kind: StepKind },

    #[error("Step {}: full open main gas required before power on", .index + 1)]
    FullOpenRequiredBeforePowerOn { index: usize },

    #[error("Step {}: DC1 cannot be switched while the power supply is on", .index + 1)]
    Dc1WhilePowerOn { index: usize },

    #[error("Step {}: {source}", .index + 1)]
    LaserPower {
        index: usize,
        #[source]
        source: LaserPowerError,
    },

    #[error("Step {}: {source}", .index + 1)]
    Voltage {
        index: usize,
        #[source]
        source: VoltageError,
    },
}

impl ValidationError {
    /// Index of the offending step
    pub fn index(&self) -> usize {
        match self {
            ValidationError::MissingKind { index }
            | ValidationError::MissingValue { index, .. }
            | ValidationError::FullOpenRequiredBeforePowerOn { index }
            | ValidationError::Dc1WhilePowerOn { index }
            | ValidationError::LaserPower { index, .. }
            | ValidationError::Voltage { index, .. } => *index,
        }
    }
}

/// Validate a sequence before a run starts.
///
/// Returns the first violation in rule order:
/// 1. every step has a kind
/// 2. every step that needs a value has one
/// 3. power supply on is preceded by main gas full open
/// 4. DC1 is not switched while the power supply is on
/// 5. laser power values are within the ceiling and on the 0.5 grid
/// 6. power supply voltages are integers
pub fn validate_sequence(steps: &[Step], limits: StepLimits) -> Result<(), ValidationError> {
    if let Some(index) = steps.iter().position(|s| s.kind.is_none()) {
        return Err(ValidationError::MissingKind { index });
    }

    for (index, step) in steps.iter().enumerate() {
        if let Some(kind) = step.kind {
            if kind.needs_value() && !step.has_value() {
                return Err(ValidationError::MissingValue { index, kind });
            }
        }
    }

    if let Some(index) = steps.iter().position(|s| s.is(StepKind::PowerSupplyOn)) {
        let gas_opened = steps[..index]
            .iter()
            .any(|s| s.is(StepKind::MainGasFullOpen));
        if !gas_opened {
            return Err(ValidationError::FullOpenRequiredBeforePowerOn { index });
        }
    }

    let mut power_on = false;
    for (index, step) in steps.iter().enumerate() {
        match step.kind {
            Some(StepKind::PowerSupplyOn) => power_on = true,
            Some(StepKind::PowerSupplyOff) => power_on = false,
            Some(StepKind::Dc1On | StepKind::Dc1Off) if power_on => {
                return Err(ValidationError::Dc1WhilePowerOn { index });
            }
            _ => {}
        }
    }

    for (index, step) in steps.iter().enumerate() {
        if step.is(StepKind::SetLaserPower) {
            check_laser_power(&step.value, limits)
                .map_err(|source| ValidationError::LaserPower { index, source })?;
        }
    }

    for (index, step) in steps.iter().enumerate() {
        if step.is(StepKind::SetPowerSupplyVoltage) {
            check_voltage(&step.value)
                .map_err(|source| ValidationError::Voltage { index, source })?;
        }
    }

    Ok(())
}
