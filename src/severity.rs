use std::fmt::{Display, Formatter};

/// Netcool wire level used when an already-cleared alert must still be
/// delivered (heartbeats and metric status), so the clearing trap stays
/// visible downstream as a low warning.
pub const CLEARING_TRAP_LEVEL: u8 = 2;

/// Check types whose already-cleared alerts are always delivered.
pub const ALWAYS_NOTIFY_TYPES: [&str; 2] = ["SensuHB:", "MetricsStatus:"];

/// Alert severity as a closed enumeration with an explicit wire level per
/// variant.
///
/// `Info` is not part of this table: info lines are dropped by the record
/// builder before severity resolution and never reach the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Minor,
    Major,
    Critical,
    /// A previously active condition has resolved.
    Clear,
    /// Sentinel for an alert that was already cleared upstream. Compared by
    /// identity, never by a numeric level; see [`resolve_level`].
    AlreadyCleared,
}

impl Severity {
    /// Parse a severity name, case-insensitively.
    ///
    /// Returns `None` for unrecognized names; the caller treats that as a
    /// per-line classification error, not a fatal one.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "minor" => Some(Self::Minor),
            "major" => Some(Self::Major),
            "critical" | "crit" => Some(Self::Critical),
            "clear" => Some(Self::Clear),
            _ => None,
        }
    }

    /// Numeric wire level for this severity.
    pub fn level(self) -> u8 {
        match self {
            Self::Minor => 3,
            Self::Major => 4,
            Self::Critical => 5,
            Self::Clear => 9,
            Self::AlreadyCleared => 0,
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minor => write!(f, "Minor"),
            Self::Major => write!(f, "Major"),
            Self::Critical => write!(f, "Critical"),
            Self::Clear => write!(f, "Clear"),
            Self::AlreadyCleared => write!(f, "AlreadyCleared"),
        }
    }
}

/// Resolve the wire level actually emitted for a record, or `None` when the
/// record is suppressed.
///
/// An already-cleared alert is suppressed outright unless its check type is
/// one of the always-notify types, in which case it is forced up to
/// [`CLEARING_TRAP_LEVEL`].
pub fn resolve_level(severity: Severity, check_type: &str) -> Option<u8> {
    match severity {
        Severity::AlreadyCleared => {
            if ALWAYS_NOTIFY_TYPES.contains(&check_type) {
                Some(CLEARING_TRAP_LEVEL)
            } else {
                None
            }
        }
        other => Some(other.level()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("Major"), Some(Severity::Major));
        assert_eq!(Severity::parse("MAJOR"), Some(Severity::Major));
        assert_eq!(Severity::parse("minor"), Some(Severity::Minor));
        assert_eq!(Severity::parse("Crit"), Some(Severity::Critical));
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("clear"), Some(Severity::Clear));
    }

    #[test]
    fn test_parse_rejects_unknown_names() {
        assert_eq!(Severity::parse("Warning"), None);
        assert_eq!(Severity::parse(""), None);
        assert_eq!(Severity::parse("Info"), None);
    }

    #[test]
    fn test_levels() {
        assert_eq!(Severity::Minor.level(), 3);
        assert_eq!(Severity::Major.level(), 4);
        assert_eq!(Severity::Critical.level(), 5);
        assert_eq!(Severity::Clear.level(), 9);
    }

    #[test]
    fn test_already_cleared_is_suppressed() {
        assert_eq!(resolve_level(Severity::AlreadyCleared, "FSUsage"), None);
        assert_eq!(resolve_level(Severity::AlreadyCleared, "keepalive"), None);
    }

    #[test]
    fn test_already_cleared_always_notify_types_force_warning() {
        assert_eq!(
            resolve_level(Severity::AlreadyCleared, "SensuHB:"),
            Some(CLEARING_TRAP_LEVEL)
        );
        assert_eq!(
            resolve_level(Severity::AlreadyCleared, "MetricsStatus:"),
            Some(CLEARING_TRAP_LEVEL)
        );
    }

    #[test]
    fn test_active_severities_pass_through() {
        assert_eq!(resolve_level(Severity::Major, "FSUsage"), Some(4));
        assert_eq!(resolve_level(Severity::Clear, "FSUsage"), Some(9));
    }
}
