//! Turns classified lines into finished alert records.
//!
//! For each non-ignored line this resolves the message template, substitutes
//! tokens, applies the clear transform and severity mapping, runs the
//! suppression checks and composes the dedup key. One [`AlertRecord`] per
//! surviving line; records are handed to the queue client and discarded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::classify::{classify_line, CheckContext, CheckState, ClassifiedLine};
use crate::errors::{ForwarderError, Result};
use crate::event::MonitoringEvent;
use crate::severity::{resolve_level, Severity};
use crate::template::{render, TemplateFields, TemplateTable};

/// FIFO message group all alerts are published under.
pub const MESSAGE_GROUP_ID: &str = "sensu-alerts";

/// Metric staleness errors get a short expiry regardless of kind, so they
/// clear quickly once the problem goes away and no clear ever arrives.
static RE_METRIC_ERRORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(check.*has not run recently|Metric check.*is erroring)")
        .expect("metric-errors pattern is valid")
});

/// Invocation-level settings threaded explicitly through the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlerConfig {
    /// In test mode the payload environment is left unset instead of `prod`.
    pub test_mode: bool,
}

impl HandlerConfig {
    fn environment(&self) -> Option<String> {
        if self.test_mode {
            None
        } else {
            Some("prod".to_string())
        }
    }
}

/// A normalized alert ready for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRecord {
    /// Normalized (short) node id; the same id is used in the alert key.
    pub node: String,
    #[serde(rename = "alertKey")]
    pub alert_key: String,
    pub summary: String,
    pub severity: u8,
    pub team: Option<String>,
    pub expiry: Option<u64>,
    pub environment: Option<String>,
}

impl AlertRecord {
    /// Deduplication id for the queue: the alert key alone, so identical
    /// (node, kind, id) alerts within the queue's dedup window collapse to
    /// one delivery.
    pub fn dedup_id(&self) -> &str {
        &self.alert_key
    }

    /// The JSON payload, base64-encoded for the queue message body.
    pub fn encoded_body(&self) -> Result<String> {
        let json = serde_json::to_vec(self).map_err(ForwarderError::Serialize)?;
        debug!(payload = %String::from_utf8_lossy(&json), "Alert payload");
        Ok(STANDARD.encode(json))
    }
}

/// Run the full normalization pipeline over one event.
///
/// Lines are processed strictly in textual order; a line that classifies as
/// ignored, fails severity resolution or is suppressed drops out without
/// affecting its neighbors.
pub fn process_event(event: &MonitoringEvent, config: &HandlerConfig) -> Vec<AlertRecord> {
    let templates = TemplateTable::from_annotations(event.annotations());
    let ctx = CheckContext {
        check_name: event.check_name(),
        interval: event.check.interval,
        occurrences: event.check.occurrences,
        output: &event.check.output,
    };

    let mut records = Vec::new();
    for line in event.output_lines() {
        let Some(classified) = classify_line(line, &ctx) else {
            continue;
        };
        if let Some(record) = build_record(&classified, event, &templates, config) {
            records.push(record);
        }
    }
    records
}

fn build_record(
    line: &ClassifiedLine,
    event: &MonitoringEvent,
    templates: &TemplateTable,
    config: &HandlerConfig,
) -> Option<AlertRecord> {
    // Info lines are a hard filter: no record, no dedup state, never an error.
    if line.severity_text.eq_ignore_ascii_case("info") {
        debug!(id = %line.id, "Dropping info line");
        return None;
    }

    let client_id = line
        .source_override
        .as_deref()
        .unwrap_or(event.entity_name());

    let template = match &line.summary {
        Some(preset) => preset.clone(),
        None => resolve_template(templates, line),
    };
    debug!(template = %template, "Using the following alert message");

    let fields = TemplateFields {
        client_id,
        id: &line.id,
        threshold: line.threshold.as_deref().unwrap_or(""),
        current_value: line.current_value.as_deref().unwrap_or(""),
        additional_text: line.additional_text.as_deref().unwrap_or(""),
    };
    let mut summary = render(&template, &fields);

    let mut expiry = line.expiry;
    if RE_METRIC_ERRORS.is_match(&summary) {
        expiry = Some(event.check.interval + 60);
    }

    let mut severity_text = line.severity_text.clone();
    if line.state == Some(CheckState::Ok) {
        severity_text = "Clear".to_string();
        summary = format!("CLEAR - {summary}");
    }

    let Some(severity) = Severity::parse(&severity_text) else {
        warn!(
            severity = %severity_text,
            id = %line.id,
            "Unrecognized severity name; skipping line"
        );
        return None;
    };
    debug!(level = severity.level(), "Mapped severity");

    let Some(level) = resolve_level(severity, &line.check_type) else {
        debug!(id = %line.id, "Skipping already cleared alert");
        return None;
    };

    // The short node id is used consistently for the key and the payload.
    let node = normalize_node(client_id);
    let alert_key = format!("{node}_{}_{}", line.check_type, line.id);

    Some(AlertRecord {
        node,
        alert_key,
        summary,
        severity: level,
        team: line.team.clone(),
        expiry,
        environment: config.environment(),
    })
}

/// Resolve which template text to render for a line without a preset summary.
///
/// A non-empty standard template wins unconditionally; otherwise the
/// per-kind template; otherwise a synthesized message so a misconfigured
/// monitor still produces something actionable.
fn resolve_template(templates: &TemplateTable, line: &ClassifiedLine) -> String {
    if let Some(standard) = templates.standard() {
        return standard.to_string();
    }
    if let Some(template) = templates.for_kind(&line.check_type) {
        return template.to_string();
    }
    if line
        .additional_text
        .as_deref()
        .is_some_and(|text| !text.is_empty())
    {
        format!("{} - ::id::: ::additional_text::", line.check_type)
    } else {
        format!(
            "{} - Monitor error. Please investigate configs",
            line.check_type
        )
    }
}

/// Strip the FQDN: the node id is just the host name.
fn normalize_node(client_id: &str) -> String {
    client_id
        .split('.')
        .next()
        .unwrap_or(client_id)
        .to_string()
}
