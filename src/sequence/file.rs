//! Sequence documents stored as TOML

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{ErrorPolicy, Step};

/// A named, reusable step list.
///
/// ```toml
/// name = "Warm-up"
/// error_policy = "break-on-error"
///
/// [[steps]]
/// kind = "main-gas-full-open"
///
/// [[steps]]
/// kind = "wait"
/// value = "5"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceFile {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Policy to run with unless overridden on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_policy: Option<ErrorPolicy>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl SequenceFile {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
            ..Self::default()
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sequence file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse sequence file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: SequenceFile = toml::from_str(content)?;
        Ok(file)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }
        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize sequence")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write sequence file: {}", path.display()))?;
        Ok(())
    }

    /// Policy from the document, falling back to `fallback`
    pub fn policy_or(&self, fallback: ErrorPolicy) -> ErrorPolicy {
        self.error_policy.unwrap_or(fallback)
    }
}
