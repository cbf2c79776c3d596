//! Dispatcher backed by the rig's HTTP device API

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use super::routes::{DeviceRequest, DeviceSettings, route};
use super::{DispatchOutcome, Dispatcher};
use crate::domain::Step;

/// Sends each step to the device API as a JSON `POST`.
///
/// The call succeeds when the response body carries `"status": "success"`.
#[derive(Clone)]
pub struct HttpDispatcher {
    base_url: String,
    token: Option<String>,
    settings: DeviceSettings,
    client: ureq::Agent,
}

impl HttpDispatcher {
    pub fn new(base_url: impl Into<String>, settings: DeviceSettings) -> Self {
        // The engine applies its own dispatch ceiling; these only bound the socket
        let client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(60))
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            settings,
            client,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Blocking request; run on the blocking pool
    fn send(&self, request: &DeviceRequest) -> Result<DispatchOutcome> {
        let url = self.url(request.path);
        let mut call = self.client.post(&url);
        if let Some(token) = &self.token {
            call = call.set("Authorization", &format!("Bearer {}", token));
        }

        let result = match &request.body {
            Some(body) => call.send_json(body.clone()),
            None => call.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Ok(DispatchOutcome::failure(format!(
                    "{} returned HTTP {}: {}",
                    request.path,
                    code,
                    detail.trim()
                )));
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to reach {}", url)),
        };

        let body: Value = response
            .into_json()
            .with_context(|| format!("Failed to parse response from {}", request.path))?;
        Ok(outcome_from_body(&body))
    }
}

/// Interpret a device API response body
pub(super) fn outcome_from_body(body: &Value) -> DispatchOutcome {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    match body.get("status").and_then(Value::as_str) {
        Some("success") => DispatchOutcome {
            success: true,
            message,
        },
        Some(status) => DispatchOutcome {
            success: false,
            message: message.or_else(|| Some(format!("status: {}", status))),
        },
        None => DispatchOutcome::failure("response has no status field"),
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, step: &Step) -> Result<DispatchOutcome> {
        let request = route(step, &self.settings)
            .ok_or_else(|| anyhow!("No device route for step '{}'", step.label()))?;
        tracing::debug!("POST {}{}", self.base_url, request.path);

        let this = self.clone();
        tokio::task::spawn_blocking(move || this.send(&request))
            .await
            .context("Device request task failed")?
    }

    fn name(&self) -> &str {
        "http"
    }
}
