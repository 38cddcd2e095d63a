pub mod policy;

use serde::{Deserialize, Serialize};

/// Severity of a finding. Ordered so policy thresholds can compare:
/// `Info < Notice < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Notice,
    Warning,
    Error,
}

impl Severity {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "notice" => Some(Self::Notice),
            "warning" | "warn" => Some(Self::Warning),
            "error" | "err" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Notice => write!(f, "notice"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Ordered identifier of a finding: (group, area, rule).
///
/// The tuple is stable across releases and is what ignore lists and severity
/// overrides key on, joined with `/` (e.g. `javascript/call/dangerous_eval`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FindingId(
    pub &'static str,
    pub &'static str,
    pub &'static str,
);

impl std::fmt::Display for FindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.0, self.1, self.2)
    }
}

/// A single analysis result. Append-only; ownership transfers to the sink on
/// emit and the analyzer never re-reads what it reported.
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub id: FindingId,
    pub severity: Severity,
    /// One-line summary.
    pub message: String,
    /// Longer explanation shown in reports.
    pub description: String,
    pub filename: String,
    pub line: u32,
    pub column: u32,
    /// Snippet or symbol that triggered the finding, when available.
    pub context: Option<String>,
}

/// Consumer of findings. Implemented by the host's error bundler; `MemorySink`
/// is the in-crate implementation used by the CLI and tests.
pub trait FindingSink {
    fn emit(&mut self, finding: Finding);
}

/// Collects findings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub findings: Vec<Finding>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl FindingSink for MemorySink {
    fn emit(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_matches_policy_expectations() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Notice);
        assert!(Severity::Notice > Severity::Info);
    }

    #[test]
    fn severity_lenient_parsing() {
        assert_eq!(Severity::from_str_lenient("WARN"), Some(Severity::Warning));
        assert_eq!(Severity::from_str_lenient("notice"), Some(Severity::Notice));
        assert_eq!(Severity::from_str_lenient("fatal"), None);
    }

    #[test]
    fn finding_id_display_joins_with_slash() {
        let id = FindingId("javascript", "call", "dangerous_eval");
        assert_eq!(id.to_string(), "javascript/call/dangerous_eval");
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let mut sink = MemorySink::new();
        for (i, sev) in [Severity::Info, Severity::Error].iter().enumerate() {
            sink.emit(Finding {
                id: FindingId("t", "t", "t"),
                severity: *sev,
                message: format!("m{i}"),
                description: String::new(),
                filename: "a.js".into(),
                line: 1,
                column: 0,
                context: None,
            });
        }
        assert_eq!(sink.findings.len(), 2);
        assert_eq!(sink.findings[0].message, "m0");
    }
}
