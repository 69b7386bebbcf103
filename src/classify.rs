//! Ordered line-classification rules for raw check output.
//!
//! Each output line is matched against a fixed rule list, top to bottom,
//! first match wins. A line either yields a [`ClassifiedLine`] carrying the
//! captured fields, or is ignored outright (comments, generic OK lines,
//! graphite metric series, timeouts below the occurrence gate).

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Standard line: `<type> (WARN|CRITICAL|CRIT|OK): ... | id,current_value,threshold,additional_text,team,severity`.
/// `additional_text` is the one field allowed to contain commas; `team` and
/// `severity` are anchored comma-free at the end so extra commas never shift
/// them.
static RE_STANDARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+) (WARN|CRITICAL|CRIT|OK): .*? \| ([^,]+),([^,]+),([^,]*),(.*),([^,]+),([^,]+)$")
        .expect("standard pattern is valid")
});

/// Standard line with a trailing `,SOURCE: <host>` that overrides the
/// reporting entity for this line only. Tried before the plain standard
/// pattern, which would otherwise match the same line with shifted fields.
static RE_STANDARD_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\S+) (WARN|CRITICAL|CRIT|OK): .*? \| ([^,]+),([^,]+),([^,]*),(.*),([^,]+),([^,]+),SOURCE: (.*)$",
    )
    .expect("standard-with-source pattern is valid")
});

static RE_GRAFANA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Grafana Alert:").expect("grafana pattern is valid"));

static RE_KEEPALIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^No keepalive sent from .* for (\d+) seconds").expect("keepalive pattern is valid")
});

static RE_TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Execution timed out|Unable to TERM.KILL the process")
        .expect("timeout pattern is valid")
});

static RE_KEEPALIVE_CLEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Keepalive last sent from").expect("keepalive-clear pattern is valid")
});

static RE_GENERIC_OK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+ OK:").expect("generic-ok pattern is valid"));

static RE_GRAPHITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+\.)+\w+ \S+ \d+").expect("graphite pattern is valid")
});

/// Unique second counts make otherwise identical invalid-output ids differ;
/// they are normalized so the id stays stable across repeats.
static RE_SECONDS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \d+ seconds ago").expect("seconds-ago pattern is valid"));

/// Per-event context the rules need: check identity, interval and occurrence
/// count are read once and never mutated mid-run.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub check_name: &'a str,
    /// Check interval in seconds; expiry computations derive from it.
    pub interval: u64,
    /// Consecutive occurrences of this result; gates timeout alerts.
    pub occurrences: u32,
    /// The full raw check output, used by the Grafana rule.
    pub output: &'a str,
}

/// Classification tag assigned to a line, used as the alert-key kind for
/// lines without a parsed check type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineKind {
    Standard,
    Grafana,
    Keepalive,
    Timeout,
    #[default]
    Invalid,
}

/// Check state parsed from a standard line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Warn,
    Critical,
    Ok,
}

impl CheckState {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "WARN" => Some(Self::Warn),
            "CRITICAL" | "CRIT" => Some(Self::Critical),
            "OK" => Some(Self::Ok),
            _ => None,
        }
    }
}

/// One classified output line with its captured fields. Transient; consumed
/// by the record builder and discarded.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedLine {
    pub kind: LineKind,
    /// Check type carried into the alert key: the parsed prefix for standard
    /// lines, the rule tag otherwise.
    pub check_type: String,
    pub state: Option<CheckState>,
    pub id: String,
    pub current_value: Option<String>,
    pub threshold: Option<String>,
    pub additional_text: Option<String>,
    pub team: Option<String>,
    pub severity_text: String,
    /// Pre-rendered summary; when set, template resolution is skipped.
    pub summary: Option<String>,
    /// Alert expiry in seconds, when the rule fixes one.
    pub expiry: Option<u64>,
    /// Entity id override from a `,SOURCE:` suffix.
    pub source_override: Option<String>,
}

/// Classify one line of check output.
///
/// Returns `None` for lines that are fully ignored: comments, generic OK
/// lines with nothing to clear, graphite metric series, and execution
/// timeouts that have not yet hit the occurrence gate.
pub fn classify_line(line: &str, ctx: &CheckContext<'_>) -> Option<ClassifiedLine> {
    debug!(line, "Check line");

    if line.starts_with('#') {
        return None;
    }

    if let Some(caps) = RE_STANDARD_SOURCE.captures(line) {
        let mut classified = standard_line(&caps);
        classified.source_override = Some(caps[9].to_string());
        return Some(classified);
    }

    if let Some(caps) = RE_STANDARD.captures(line) {
        return Some(standard_line(&caps));
    }

    if RE_GRAFANA.is_match(line) {
        let severity_text = match line.rsplit_once('|') {
            Some((_, after)) => after.trim().to_string(),
            None => line.to_string(),
        };
        let summary = ctx.output.trim_end().to_string();
        return Some(ClassifiedLine {
            kind: LineKind::Grafana,
            check_type: "grafana".to_string(),
            id: summary.clone(),
            severity_text,
            summary: Some(summary),
            ..Default::default()
        });
    }

    if let Some(caps) = RE_KEEPALIVE.captures(line) {
        let seconds: u64 = caps[1].parse().unwrap_or(0);
        let minutes = seconds as f64 / 60.0;
        return Some(ClassifiedLine {
            kind: LineKind::Keepalive,
            check_type: "keepalive".to_string(),
            id: "Sensu agent offline".to_string(),
            team: Some("SysAut".to_string()),
            severity_text: "Major".to_string(),
            summary: Some(format!(
                "Sensu agent offline - No communication for {minutes:.1} mins"
            )),
            expiry: Some(130),
            ..Default::default()
        });
    }

    if RE_TIMEOUT.is_match(line) {
        if ctx.occurrences < 3 {
            debug!("Ignoring timeout until there have been 3 occurrences");
            return None;
        }
        let minutes = ctx.interval as f64 / 60.0;
        return Some(ClassifiedLine {
            kind: LineKind::Timeout,
            check_type: "timeout".to_string(),
            state: Some(CheckState::Warn),
            id: ctx.check_name.to_string(),
            team: Some("SysAut".to_string()),
            severity_text: "Minor".to_string(),
            summary: Some(format!(
                "Timeout running - {} - Monitor frequency is: {minutes:.1} mins.",
                ctx.check_name
            )),
            expiry: Some(ctx.interval + 15),
            ..Default::default()
        });
    }

    if RE_KEEPALIVE_CLEAR.is_match(line) {
        return Some(ClassifiedLine {
            kind: LineKind::Keepalive,
            check_type: "keepalive".to_string(),
            id: "Sensu agent offline".to_string(),
            team: Some("SysAut".to_string()),
            severity_text: "Clear".to_string(),
            summary: Some("CLEAR - Sensu agent is now online".to_string()),
            ..Default::default()
        });
    }

    if RE_GENERIC_OK.is_match(line) {
        // A plain OK that didn't match the standard format has nothing to clear.
        return None;
    }

    if RE_GRAPHITE.is_match(line) {
        return None;
    }

    // Anything else is an execution error from the agent itself,
    // e.g. "sh: check-ports.pl: command not found".
    let summary = format!(
        "Invalid Sensu check result - {} - {line}",
        ctx.check_name
    );
    let id = RE_SECONDS_AGO
        .replace_all(&summary, " X seconds ago")
        .into_owned();
    Some(ClassifiedLine {
        kind: LineKind::Invalid,
        check_type: "invalid".to_string(),
        state: Some(CheckState::Warn),
        id,
        team: Some("SysAut".to_string()),
        severity_text: "Major".to_string(),
        summary: Some(summary),
        expiry: Some(ctx.interval + 60),
        ..Default::default()
    })
}

fn standard_line(caps: &regex::Captures<'_>) -> ClassifiedLine {
    let classified = ClassifiedLine {
        kind: LineKind::Standard,
        check_type: caps[1].to_string(),
        state: CheckState::parse(&caps[2]),
        id: caps[3].to_string(),
        current_value: Some(caps[4].to_string()),
        threshold: Some(caps[5].to_string()),
        additional_text: Some(caps[6].to_string()),
        team: Some(caps[7].to_string()),
        severity_text: caps[8].to_string(),
        ..Default::default()
    };
    debug!(
        check_type = %classified.check_type,
        state = ?classified.state,
        id = %classified.id,
        current_value = ?classified.current_value,
        threshold = ?classified.threshold,
        additional_text = ?classified.additional_text,
        team = ?classified.team,
        severity = %classified.severity_text,
        "Mapped standard line fields"
    );
    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(output: &'a str) -> CheckContext<'a> {
        CheckContext {
            check_name: "check-disk",
            interval: 300,
            occurrences: 1,
            output,
        }
    }

    #[test]
    fn test_comment_is_ignored() {
        assert!(classify_line("# some comment", &ctx("")).is_none());
    }

    #[test]
    fn test_standard_line_extraction() {
        let line = "FSUsage WARN: / 9.5% usage (2.8 GB/30.0 GB) | /,9.5,4,(2.8 GB/30.0 GB),SysAut,Major";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Standard);
        assert_eq!(classified.check_type, "FSUsage");
        assert_eq!(classified.state, Some(CheckState::Warn));
        assert_eq!(classified.id, "/");
        assert_eq!(classified.current_value.as_deref(), Some("9.5"));
        assert_eq!(classified.threshold.as_deref(), Some("4"));
        assert_eq!(
            classified.additional_text.as_deref(),
            Some("(2.8 GB/30.0 GB)")
        );
        assert_eq!(classified.team.as_deref(), Some("SysAut"));
        assert_eq!(classified.severity_text, "Major");
        assert!(classified.summary.is_none());
    }

    #[test]
    fn test_standard_line_commas_in_additional_text() {
        let line = "PortCheck CRITICAL: ports down | tcp/443,0,1,down on a,b and c,NetOps,Critical";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.id, "tcp/443");
        assert_eq!(classified.additional_text.as_deref(), Some("down on a,b and c"));
        assert_eq!(classified.team.as_deref(), Some("NetOps"));
        assert_eq!(classified.severity_text, "Critical");
    }

    #[test]
    fn test_standard_line_with_source_override() {
        let line = "PingCheck WARN: host unreachable | host1,1,0,,NetOps,Major,SOURCE: probe01.example.com";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Standard);
        assert_eq!(classified.team.as_deref(), Some("NetOps"));
        assert_eq!(classified.severity_text, "Major");
        assert_eq!(
            classified.source_override.as_deref(),
            Some("probe01.example.com")
        );
    }

    #[test]
    fn test_standard_ok_state() {
        let line = "FSUsage OK: / 1.5% usage | /,1.5,4,,SysAut,Major";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.state, Some(CheckState::Ok));
    }

    #[test]
    fn test_grafana_alert() {
        let line = "Grafana Alert: CPU usage on web01 | Major";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Grafana);
        assert_eq!(classified.check_type, "grafana");
        assert_eq!(classified.severity_text, "Major");
        assert_eq!(classified.summary.as_deref(), Some(line));
        assert_eq!(classified.id, line);
    }

    #[test]
    fn test_keepalive_missing() {
        let line = "No keepalive sent from web01 for 630 seconds (>= 120)";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Keepalive);
        assert_eq!(classified.check_type, "keepalive");
        assert_eq!(classified.id, "Sensu agent offline");
        assert_eq!(classified.team.as_deref(), Some("SysAut"));
        assert_eq!(classified.severity_text, "Major");
        assert_eq!(classified.expiry, Some(130));
        assert_eq!(
            classified.summary.as_deref(),
            Some("Sensu agent offline - No communication for 10.5 mins")
        );
    }

    #[test]
    fn test_timeout_below_occurrence_gate_is_ignored() {
        let line = "Execution timed out";
        let context = CheckContext {
            occurrences: 2,
            ..ctx(line)
        };
        assert!(classify_line(line, &context).is_none());
    }

    #[test]
    fn test_timeout_at_occurrence_gate() {
        let line = "Execution timed out";
        let context = CheckContext {
            occurrences: 3,
            ..ctx(line)
        };
        let classified = classify_line(line, &context).unwrap();
        assert_eq!(classified.kind, LineKind::Timeout);
        assert_eq!(classified.severity_text, "Minor");
        assert_eq!(classified.state, Some(CheckState::Warn));
        assert_eq!(classified.expiry, Some(315));
        assert_eq!(classified.team.as_deref(), Some("SysAut"));
        assert_eq!(classified.id, "check-disk");
        assert_eq!(
            classified.summary.as_deref(),
            Some("Timeout running - check-disk - Monitor frequency is: 5.0 mins.")
        );
    }

    #[test]
    fn test_term_kill_is_a_timeout() {
        let line = "Unable to TERM/KILL the process: check-disk";
        let context = CheckContext {
            occurrences: 5,
            ..ctx(line)
        };
        let classified = classify_line(line, &context).unwrap();
        assert_eq!(classified.kind, LineKind::Timeout);
    }

    #[test]
    fn test_keepalive_restored() {
        let line = "Keepalive last sent from web01 at 2024-01-01";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Keepalive);
        assert_eq!(classified.severity_text, "Clear");
        assert_eq!(
            classified.summary.as_deref(),
            Some("CLEAR - Sensu agent is now online")
        );
        assert_eq!(classified.id, "Sensu agent offline");
    }

    #[test]
    fn test_generic_ok_is_ignored() {
        assert!(classify_line("CheckPing OK: all hosts reachable", &ctx("")).is_none());
    }

    #[test]
    fn test_graphite_metric_line_is_ignored() {
        assert!(classify_line("servers.web01.cpu.idle 97.2 1700000000", &ctx("")).is_none());
    }

    #[test]
    fn test_fallback_invalid_output() {
        let line = "sh: check-ports.pl: command not found";
        let classified = classify_line(line, &ctx(line)).unwrap();
        assert_eq!(classified.kind, LineKind::Invalid);
        assert_eq!(classified.check_type, "invalid");
        assert_eq!(classified.severity_text, "Major");
        assert_eq!(classified.team.as_deref(), Some("SysAut"));
        assert_eq!(classified.expiry, Some(360));
        assert_eq!(
            classified.summary.as_deref(),
            Some("Invalid Sensu check result - check-disk - sh: check-ports.pl: command not found")
        );
        assert_eq!(classified.id, classified.summary.clone().unwrap());
    }

    #[test]
    fn test_fallback_id_normalizes_second_counts() {
        let first = classify_line("agent restarted 42 seconds ago", &ctx("")).unwrap();
        let second = classify_line("agent restarted 57 seconds ago", &ctx("")).unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.id.ends_with("agent restarted X seconds ago"));
        // The rendered summary keeps the real count.
        assert!(first.summary.unwrap().ends_with("42 seconds ago"));
    }
}
