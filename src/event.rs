use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{ForwarderError, Result};

/// A single Sensu event as delivered on the handler's stdin.
///
/// Only the fields the normalization pipeline needs are modeled; everything
/// else in the event document is ignored. The event is immutable once parsed
/// and owned by exactly one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringEvent {
    pub entity: Entity,
    pub check: Check,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Check {
    pub metadata: Metadata,
    /// Check interval in seconds. Used for expiry computation.
    #[serde(default)]
    pub interval: u64,
    /// How many consecutive times the check has produced this result.
    #[serde(default)]
    pub occurrences: u32,
    /// Raw check output, possibly multi-line, possibly with `\r\n` endings.
    #[serde(default)]
    pub output: String,
    /// Raw check state as reported by the backend. Advisory only; the
    /// pipeline classifies per line, not per event.
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub annotations: Option<HashMap<String, String>>,
}

impl MonitoringEvent {
    /// Parse an event from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns [`ForwarderError::InvalidEvent`] when the document is not
    /// valid JSON or required fields are missing. This is fatal for the
    /// invocation; nothing gets published.
    pub fn from_json(input: &str) -> Result<Self> {
        let event: MonitoringEvent =
            serde_json::from_str(input).map_err(ForwarderError::InvalidEvent)?;
        debug!(
            entity = %event.entity.metadata.name,
            check = %event.check.metadata.name,
            interval = event.check.interval,
            occurrences = event.check.occurrences,
            "Parsed monitoring event"
        );
        Ok(event)
    }

    /// The reporting entity id, as sent by the backend (may be an FQDN).
    pub fn entity_name(&self) -> &str {
        &self.entity.metadata.name
    }

    /// The check name, used for timeout and invalid-output summaries.
    pub fn check_name(&self) -> &str {
        &self.check.metadata.name
    }

    /// Check annotations, when present.
    pub fn annotations(&self) -> Option<&HashMap<String, String>> {
        self.check.metadata.annotations.as_ref()
    }

    /// Lines of check output with Windows line endings stripped.
    pub fn output_lines(&self) -> impl Iterator<Item = &str> {
        self.check
            .output
            .lines()
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
    }
}
