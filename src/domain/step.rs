use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Device action a step performs.
///
/// The set is closed: every kind has a metadata entry in [`StepKind::info`]
/// and a route in the HTTP dispatcher, both checked exhaustively by the
/// compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    LaserOn,
    LaserOff,
    SetLaserPower,
    CarrierGasOff,
    SetCarrierFlow,
    MainGasOn,
    MainGasOff,
    MainGasFullOpen,
    SetMainGasFlow,
    SetHeaterTemperature,
    HeaterOff,
    PowerSupplyOn,
    PowerSupplyOff,
    SetPowerSupplyVoltage,
    Dc1On,
    Dc1Off,
    UltrasonicOn,
    UltrasonicOff,
    Wait,
    End,
}

/// Static metadata for a step kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepKindInfo {
    /// Whether the step requires a value before a run may start
    pub needs_value: bool,
    /// Operator-facing label
    pub display_name: &'static str,
    /// Unit of the value, if the step takes one
    pub unit: Option<&'static str>,
}

const fn action(display_name: &'static str) -> StepKindInfo {
    StepKindInfo {
        needs_value: false,
        display_name,
        unit: None,
    }
}

const fn setpoint(display_name: &'static str, unit: &'static str) -> StepKindInfo {
    StepKindInfo {
        needs_value: true,
        display_name,
        unit: Some(unit),
    }
}

impl StepKind {
    /// Every kind, in the order the editor offers them
    pub const ALL: [StepKind; 20] = [
        StepKind::LaserOn,
        StepKind::LaserOff,
        StepKind::SetLaserPower,
        StepKind::CarrierGasOff,
        StepKind::SetCarrierFlow,
        StepKind::MainGasOn,
        StepKind::MainGasOff,
        StepKind::MainGasFullOpen,
        StepKind::SetMainGasFlow,
        StepKind::SetHeaterTemperature,
        StepKind::HeaterOff,
        StepKind::PowerSupplyOn,
        StepKind::PowerSupplyOff,
        StepKind::SetPowerSupplyVoltage,
        StepKind::Dc1On,
        StepKind::Dc1Off,
        StepKind::UltrasonicOn,
        StepKind::UltrasonicOff,
        StepKind::Wait,
        StepKind::End,
    ];

    pub const fn info(self) -> StepKindInfo {
        match self {
            StepKind::LaserOn => action("Laser on"),
            StepKind::LaserOff => action("Laser off"),
            StepKind::SetLaserPower => setpoint("Set laser power", "%"),
            StepKind::CarrierGasOff => action("Carrier gas off"),
            StepKind::SetCarrierFlow => setpoint("Set carrier gas flow", "SLM"),
            StepKind::MainGasOn => action("Main gas on"),
            StepKind::MainGasOff => action("Main gas off"),
            StepKind::MainGasFullOpen => action("Main gas full open"),
            StepKind::SetMainGasFlow => setpoint("Set main gas flow", "flow unit"),
            StepKind::SetHeaterTemperature => setpoint("Set heater temperature", "°C"),
            StepKind::HeaterOff => action("Heater off"),
            StepKind::PowerSupplyOn => action("Power supply on"),
            StepKind::PowerSupplyOff => action("Power supply off"),
            StepKind::SetPowerSupplyVoltage => setpoint("Set DC1 voltage", "V"),
            StepKind::Dc1On => action("DC1 on"),
            StepKind::Dc1Off => action("DC1 off"),
            StepKind::UltrasonicOn => action("Ultrasonic on"),
            StepKind::UltrasonicOff => action("Ultrasonic off"),
            StepKind::Wait => setpoint("Wait", "s"),
            StepKind::End => action("End"),
        }
    }

    #[inline]
    pub const fn needs_value(self) -> bool {
        self.info().needs_value
    }

    #[inline]
    pub const fn display_name(self) -> &'static str {
        self.info().display_name
    }

    /// Identifier used in sequence documents and on the command line
    pub const fn as_str(self) -> &'static str {
        match self {
            StepKind::LaserOn => "laser-on",
            StepKind::LaserOff => "laser-off",
            StepKind::SetLaserPower => "set-laser-power",
            StepKind::CarrierGasOff => "carrier-gas-off",
            StepKind::SetCarrierFlow => "set-carrier-flow",
            StepKind::MainGasOn => "main-gas-on",
            StepKind::MainGasOff => "main-gas-off",
            StepKind::MainGasFullOpen => "main-gas-full-open",
            StepKind::SetMainGasFlow => "set-main-gas-flow",
            StepKind::SetHeaterTemperature => "set-heater-temperature",
            StepKind::HeaterOff => "heater-off",
            StepKind::PowerSupplyOn => "power-supply-on",
            StepKind::PowerSupplyOff => "power-supply-off",
            StepKind::SetPowerSupplyVoltage => "set-power-supply-voltage",
            StepKind::Dc1On => "dc1-on",
            StepKind::Dc1Off => "dc1-off",
            StepKind::UltrasonicOn => "ultrasonic-on",
            StepKind::UltrasonicOff => "ultrasonic-off",
            StepKind::Wait => "wait",
            StepKind::End => "end",
        }
    }

    /// Kinds handled inside the engine that never reach a dispatcher
    #[inline]
    pub const fn is_internal(self) -> bool {
        matches!(self, StepKind::Wait | StepKind::End)
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        StepKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown step kind: {}", s))
    }
}

/// One user-authored action in a sequence.
///
/// `kind` is `None` for a freshly added row the operator has not filled in yet.
/// `value` is kept as typed text so that editing can hold partial input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StepKind>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
}

impl Step {
    /// An empty row as created by "add step"
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(kind: StepKind, value: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            value: value.into(),
        }
    }

    /// A step that takes no value
    pub fn action(kind: StepKind) -> Self {
        Self::new(kind, "")
    }

    pub fn is(&self, kind: StepKind) -> bool {
        self.kind == Some(kind)
    }

    pub fn has_value(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// The value parsed as a number, if it is one
    pub fn numeric_value(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Human-readable label, e.g. "Set laser power: 50 %"
    pub fn label(&self) -> String {
        let Some(kind) = self.kind else {
            return "(no action selected)".to_string();
        };
        let info = kind.info();
        if !self.has_value() {
            return info.display_name.to_string();
        }
        match info.unit {
            Some(unit) => format!("{}: {} {}", info.display_name, self.value.trim(), unit),
            None => format!("{}: {}", info.display_name, self.value.trim()),
        }
    }
}
