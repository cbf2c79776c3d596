//! Device dispatch seam
//!
//! The engine hands every non-internal step to a [`Dispatcher`] and only looks
//! at whether the outcome reports success.

mod http;
mod routes;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::Step;

pub use http::HttpDispatcher;
pub use routes::{DeviceRequest, DeviceSettings, FlowUnit, route};

/// Result of a single device call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Whether the device accepted the command
    pub success: bool,

    /// Message reported by the device API, if any
    pub message: Option<String>,
}

impl DispatchOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Trait for step executors
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Perform the device action for `step`
    ///
    /// An `Err` or a panic is treated by the engine exactly like an
    /// unsuccessful outcome. `wait` and `end` steps never reach this method.
    ///
    /// The engine abandons the call on stop or timeout by dropping it. That
    /// does not undo a request the device already received, so the rig may
    /// have changed even though the step is not recorded.
    async fn dispatch(&self, step: &Step) -> Result<DispatchOutcome>;

    /// Name used in log output
    fn name(&self) -> &str;
}
