use crate::report::policy::PolicyVerdict;
use crate::report::{Finding, Severity};

/// Render findings as console output, grouped by severity then file.
pub fn render(findings: &[Finding], verdict: &PolicyVerdict) -> String {
    let mut output = String::new();

    if findings.is_empty() {
        output.push_str("\n  No findings.\n\n");
        return output;
    }

    let mut sorted: Vec<&Finding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.filename.cmp(&b.filename))
            .then_with(|| a.line.cmp(&b.line))
    });

    output.push_str(&format!("\n  {} finding(s):\n\n", findings.len()));

    for finding in &sorted {
        let severity_tag = match finding.severity {
            Severity::Error => "[ERROR]  ",
            Severity::Warning => "[WARNING]",
            Severity::Notice => "[NOTICE] ",
            Severity::Info => "[INFO]   ",
        };
        output.push_str(&format!(
            "  {} {} {}\n",
            severity_tag, finding.id, finding.message
        ));
        output.push_str(&format!(
            "            at {}:{}:{}\n",
            finding.filename, finding.line, finding.column
        ));
        if let Some(context) = &finding.context {
            output.push_str(&format!("            in {}\n", context));
        }
        output.push('\n');
    }

    let status = if verdict.pass { "PASS" } else { "FAIL" };
    output.push_str(&format!(
        "  Result: {} (threshold: {}, highest: {})\n\n",
        status,
        verdict.fail_threshold,
        verdict
            .highest_severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "none".into()),
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FindingId;

    #[test]
    fn renders_severity_groups_and_verdict() {
        let findings = vec![Finding {
            id: FindingId("javascript", "call", "dangerous_eval"),
            severity: Severity::Error,
            message: "eval() evaluates a string as code".into(),
            description: String::new(),
            filename: "content/main.js".into(),
            line: 4,
            column: 2,
            context: Some("eval".into()),
        }];
        let verdict = PolicyVerdict {
            pass: false,
            total_findings: 1,
            effective_findings: 1,
            highest_severity: Some(Severity::Error),
            fail_threshold: Severity::Error,
        };
        let rendered = render(&findings, &verdict);
        assert!(rendered.contains("[ERROR]"));
        assert!(rendered.contains("content/main.js:4:2"));
        assert!(rendered.contains("Result: FAIL"));
    }

    #[test]
    fn empty_findings_render_clean() {
        let verdict = PolicyVerdict {
            pass: true,
            total_findings: 0,
            effective_findings: 0,
            highest_severity: None,
            fail_threshold: Severity::Error,
        };
        assert!(render(&[], &verdict).contains("No findings"));
    }
}
