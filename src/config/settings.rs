//! Settings configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::FlowUnit;
use crate::domain::ErrorPolicy;
use crate::engine::EngineTiming;

/// Device API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Base URL of the rig's device API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Bearer token sent with every request (empty = no auth header)
    #[serde(default)]
    pub token: String,

    /// Laser controller caps PWM at 95 %
    #[serde(default)]
    pub max_pwm_limited: bool,

    /// Unit main gas flow values are entered in
    #[serde(default)]
    pub main_gas_flow_unit: FlowUnit,

    /// Heater set value is sent in tenths of a degree
    #[serde(default)]
    pub heater_decimal_point: bool,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Ceiling for one device call, in seconds
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Length of each progress animation
    #[serde(default = "default_animation_millis")]
    pub animation_millis: u64,

    #[serde(default = "default_frame_millis")]
    pub frame_millis: u64,

    /// Policy used when neither the sequence file nor the command line sets one
    #[serde(default)]
    pub error_policy: ErrorPolicy,
}

fn default_api_base_url() -> String {
    "http://localhost:5555/api".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_animation_millis() -> u64 {
    1000
}

fn default_frame_millis() -> u64 {
    16
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token: String::new(),
            max_pwm_limited: false,
            main_gas_flow_unit: FlowUnit::default(),
            heater_decimal_point: false,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            animation_millis: default_animation_millis(),
            frame_millis: default_frame_millis(),
            error_policy: ErrorPolicy::default(),
        }
    }
}

impl EngineSettings {
    pub fn timing(&self) -> EngineTiming {
        EngineTiming {
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_secs.max(1)),
            animation: Duration::from_millis(self.animation_millis),
            frame: Duration::from_millis(self.frame_millis.max(1)),
            ..EngineTiming::default()
        }
    }
}
