//! Mapping from step kinds to device API calls

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::{Step, StepKind};

/// Unit the main gas flow value is entered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowUnit {
    #[serde(rename = "mL/min")]
    MillilitersPerMinute,
    #[default]
    #[serde(rename = "L/min")]
    LitersPerMinute,
    #[serde(rename = "m^3/h")]
    CubicMetersPerHour,
    #[serde(rename = "raw")]
    Raw,
}

impl FlowUnit {
    /// Convert an operator value into the controller's native flow units
    pub fn to_device(self, value: f64) -> f64 {
        match self {
            FlowUnit::MillilitersPerMinute => value / 100.0,
            FlowUnit::LitersPerMinute => value * 10.0,
            FlowUnit::CubicMetersPerHour => value / 0.06 * 10.0,
            FlowUnit::Raw => value,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowUnit::MillilitersPerMinute => "mL/min",
            FlowUnit::LitersPerMinute => "L/min",
            FlowUnit::CubicMetersPerHour => "m^3/h",
            FlowUnit::Raw => "raw",
        }
    }
}

impl std::fmt::Display for FlowUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Device configuration the routing depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSettings {
    pub main_gas_flow_unit: FlowUnit,
    /// Heater set value has one decimal place (SV is sent in tenths)
    pub heater_decimal_point: bool,
}

/// A resolved device API call
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    /// Path below the API base URL, e.g. `/uc2000/set_pwm`
    pub path: &'static str,
    pub body: Option<Value>,
}

impl DeviceRequest {
    fn bare(path: &'static str) -> Self {
        Self { path, body: None }
    }

    fn with_body(path: &'static str, body: Value) -> Self {
        Self {
            path,
            body: Some(body),
        }
    }
}

/// Resolve the API call for `step`.
///
/// Returns `None` for steps that are not sent to a device: `wait`, `end`, a
/// step without a kind, and setpoints whose value is not a number.
pub fn route(step: &Step, settings: &DeviceSettings) -> Option<DeviceRequest> {
    let kind = step.kind?;
    let value = || step.numeric_value();

    let request = match kind {
        StepKind::LaserOn => {
            DeviceRequest::with_body("/uc2000/set_laser", json!({ "enable": true }))
        }
        StepKind::LaserOff => {
            DeviceRequest::with_body("/uc2000/set_laser", json!({ "enable": false }))
        }
        StepKind::SetLaserPower => {
            DeviceRequest::with_body("/uc2000/set_pwm", json!({ "percentage": value()? }))
        }
        StepKind::CarrierGasOff => {
            DeviceRequest::with_body("/alicat_api/set_flow_rate", json!({ "flow_rate": 0 }))
        }
        StepKind::SetCarrierFlow => {
            DeviceRequest::with_body("/alicat_api/set_flow_rate", json!({ "flow_rate": value()? }))
        }
        StepKind::MainGasOn => DeviceRequest::bare("/azbil_api/flow_turn_on"),
        StepKind::MainGasOff => DeviceRequest::bare("/azbil_api/flow_turn_off"),
        StepKind::MainGasFullOpen => DeviceRequest::bare("/azbil_api/flow_turn_full"),
        StepKind::SetMainGasFlow => {
            let flow = settings.main_gas_flow_unit.to_device(value()?);
            DeviceRequest::with_body("/azbil_api/set_flow", json!({ "flow": flow }))
        }
        StepKind::SetHeaterTemperature => {
            let celsius = value()?;
            let sv = if settings.heater_decimal_point {
                celsius * 10.0
            } else {
                celsius
            };
            DeviceRequest::with_body("/heater/update", json!({ "SV": sv }))
        }
        StepKind::HeaterOff => DeviceRequest::with_body("/heater/update", json!({ "SV": 0 })),
        StepKind::PowerSupplyOn => DeviceRequest::bare("/power_supply/power_on"),
        StepKind::PowerSupplyOff => DeviceRequest::bare("/power_supply/power_off"),
        StepKind::SetPowerSupplyVoltage => {
            let voltage = value()?;
            DeviceRequest::with_body(
                "/power_supply/write_voltage",
                json!({ "voltage": voltage as i64 }),
            )
        }
        StepKind::Dc1On => DeviceRequest::bare("/power_supply/dc1_turn_on"),
        StepKind::Dc1Off => DeviceRequest::bare("/power_supply/dc1_turn_off"),
        StepKind::UltrasonicOn => DeviceRequest::bare("/ultrasonic/turn_on"),
        StepKind::UltrasonicOff => DeviceRequest::bare("/ultrasonic/turn_off"),
        StepKind::Wait | StepKind::End => return None,
    };
    Some(request)
}
