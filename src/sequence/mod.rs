//! Step list authoring: editing, validation and sequence documents

mod editor;
mod file;
mod validate;

pub use editor::{EditRejection, SequenceEditor};
pub use file::SequenceFile;
pub use validate::{
    LIMITED_MAX_LASER_POWER, LaserPowerError, MAX_LASER_POWER, StepLimits, ValidationError,
    VoltageError, check_laser_power, check_voltage, validate_sequence,
};
