use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Template used when a check carries no `alert_message` annotation at all.
pub const DEFAULT_TEMPLATE: &str = "Alert from ::client_id:: ID: ::id:: Threshold: ::threshold:: \
     Current Value: ::current_value:: Additional Message: ::additional_text:: (DEFAULT MESSAGE)";

/// Annotation key for the check-wide message template.
const STANDARD_KEY: &str = "alert_message";
/// Prefix for per-kind message templates, e.g. `alert_message.FSUsage`.
const KIND_KEY_PREFIX: &str = "alert_message.";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::(client_id|id|threshold|current_value|additional_text)::")
        .expect("token pattern is valid")
});

/// Mapping from alert kind to message template, built once per invocation
/// from the check annotations and read-only thereafter.
///
/// A check that raises several alert types carries one
/// `alert_message.<kind>` annotation per type; a plain `alert_message`
/// annotation installs a single template under the `standard` kind, which
/// takes precedence over every per-kind entry.
#[derive(Debug, Default)]
pub struct TemplateTable {
    templates: HashMap<String, String>,
}

impl TemplateTable {
    /// Build the table from check annotations.
    ///
    /// When no `alert_message` key of either form is present, the built-in
    /// [`DEFAULT_TEMPLATE`] is installed as the standard template.
    pub fn from_annotations(annotations: Option<&HashMap<String, String>>) -> Self {
        let mut templates = HashMap::new();

        if let Some(annotations) = annotations {
            for (key, value) in annotations {
                if key == STANDARD_KEY {
                    templates.insert("standard".to_string(), value.clone());
                } else if let Some(kind) = key.strip_prefix(KIND_KEY_PREFIX) {
                    templates.insert(kind.to_string(), value.clone());
                }
            }
        }

        if templates.is_empty() {
            debug!("No alert messages. Using default format");
            templates.insert("standard".to_string(), DEFAULT_TEMPLATE.to_string());
        }

        debug!(?templates, "Resolved alert message templates");
        Self { templates }
    }

    /// The check-wide standard template, if present and non-empty.
    pub fn standard(&self) -> Option<&str> {
        self.templates
            .get("standard")
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }

    /// The template registered for a specific kind, if present and non-empty.
    pub fn for_kind(&self, kind: &str) -> Option<&str> {
        self.templates
            .get(kind)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Field values substituted into a message template. Absent fields render
/// as empty strings; substitution never fails.
#[derive(Debug, Default)]
pub struct TemplateFields<'a> {
    pub client_id: &'a str,
    pub id: &'a str,
    pub threshold: &'a str,
    pub current_value: &'a str,
    pub additional_text: &'a str,
}

/// Substitute recognized tokens into `template`.
///
/// The substitution is a single pass over the template text: tokens that
/// appear inside substituted field values are left alone rather than
/// expanded again.
pub fn render(template: &str, fields: &TemplateFields<'_>) -> String {
    TOKEN_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "client_id" => fields.client_id,
            "id" => fields.id,
            "threshold" => fields.threshold,
            "current_value" => fields.current_value,
            "additional_text" => fields.additional_text,
            _ => unreachable!("token pattern only captures known names"),
        })
        .into_owned()
}
