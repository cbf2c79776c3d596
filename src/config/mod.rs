//! Configuration loading and management

mod io;
mod settings;

pub use settings::{DeviceConfig, EngineSettings};

use serde::{Deserialize, Serialize};

use crate::dispatch::{DeviceSettings, HttpDispatcher};
use crate::engine::EngineTiming;
use crate::sequence::StepLimits;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device API and controller flags
    #[serde(default)]
    pub device: DeviceConfig,

    /// Run timing and default error policy
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Config {
    /// Create a config with sensible defaults
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Guard context for editing and validating steps
    pub fn step_limits(&self) -> StepLimits {
        StepLimits {
            max_pwm_limited: self.device.max_pwm_limited,
        }
    }

    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            main_gas_flow_unit: self.device.main_gas_flow_unit,
            heater_decimal_point: self.device.heater_decimal_point,
        }
    }

    pub fn engine_timing(&self) -> EngineTiming {
        self.engine.timing()
    }

    /// Build the production dispatcher for the configured device API
    pub fn http_dispatcher(&self) -> HttpDispatcher {
        HttpDispatcher::new(&self.device.api_base_url, self.device_settings())
            .with_token(self.device.token.clone())
    }
}
