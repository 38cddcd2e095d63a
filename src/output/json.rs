use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::report::policy::PolicyVerdict;
use crate::report::Finding;

#[derive(Serialize)]
struct JsonReport<'a> {
    target: &'a str,
    generated_at: DateTime<Utc>,
    findings: &'a [Finding],
    verdict: &'a PolicyVerdict,
}

/// Render findings as a JSON report.
pub fn render(findings: &[Finding], verdict: &PolicyVerdict, target_name: &str) -> Result<String> {
    let report = JsonReport {
        target: target_name,
        generated_at: Utc::now(),
        findings,
        verdict,
    };
    let json = serde_json::to_string_pretty(&report)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    #[test]
    fn report_is_valid_json_with_verdict() {
        let verdict = PolicyVerdict {
            pass: true,
            total_findings: 0,
            effective_findings: 0,
            highest_severity: None,
            fail_threshold: Severity::Error,
        };
        let rendered = render(&[], &verdict, "my-addon").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["target"], "my-addon");
        assert_eq!(parsed["verdict"]["pass"], true);
    }
}
