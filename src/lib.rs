//! jetctl - sequence execution for the plasma jet rig
//!
//! An operator authors an ordered list of device steps (laser, gases, heater,
//! power supply, ultrasonic, waits). jetctl validates the list against the
//! rig's safety rules, then runs it one step at a time through a
//! [`dispatch::Dispatcher`], recording every attempted step and finishing
//! with a single closing record that says how the run ended.
//!
//! ## Layout
//!
//! - [`domain`]: steps, run records and the pure execution state machine
//! - [`sequence`]: editing guards, pre-run validation and sequence files
//! - [`engine`]: the async driver (dispatch timeout, wait countdown,
//!   eased progress, stop handling)
//! - [`dispatch`]: the dispatcher seam and the HTTP device API client
//! - [`config`]: `~/.jetctl/config.toml`

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod sequence;

pub use domain::*;
