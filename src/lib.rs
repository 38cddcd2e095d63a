//! addonvet — static analyzer for browser-extension JavaScript.
//!
//! Source text is parsed by an external engine process (see [`bridge`]), the
//! resulting syntax tree is walked by an abstract interpreter (see [`interp`])
//! that folds constants, tracks taint through wrapper bypasses, and dispatches
//! dangerous-API checks (see [`rules`]). Findings stream to a
//! [`report::FindingSink`]; per-file faults never escape the file boundary.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use addonvet::{scan, ScanOptions};
//!
//! let options = ScanOptions::default();
//! let report = scan(Path::new("./my-extension"), &options).unwrap();
//! println!("Pass: {}, Findings: {}", report.verdict.pass, report.findings.len());
//! ```

pub mod ast;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod error;
pub mod interp;
pub mod output;
pub mod report;
pub mod rules;

use std::collections::BTreeSet;
use std::path::Path;

use bridge::{FailureKind, JsEngine};
use config::Config;
use error::Result;
use interp::{FinalContext, Traverser};
use output::OutputFormat;
use report::policy::PolicyVerdict;
use report::{Finding, FindingId, FindingSink, MemorySink, Severity};

/// Host-mode flags supplied with each file. They gate a handful of catalog
/// checks and are otherwise opaque to the analyzer.
#[derive(Debug, Clone, Default)]
pub struct ModeFlags {
    /// The add-on declared itself restartless/bootstrapped.
    pub bootstrapped: bool,
    /// Application versions the add-on claims to support.
    pub supported_targets: BTreeSet<String>,
}

/// One file of source text plus its analysis context.
#[derive(Debug, Clone)]
pub struct SourceEnvelope {
    pub filename: String,
    pub content: String,
    pub flags: ModeFlags,
}

/// Analyze one file end to end: parse via the engine, walk the tree, emit
/// findings. Parse failures are translated into exactly one finding and the
/// file is skipped (`None`); nothing here is fatal to the enclosing run.
pub fn analyze(
    engine: &mut JsEngine,
    envelope: &SourceEnvelope,
    sink: &mut dyn FindingSink,
) -> Option<FinalContext> {
    let tree = match engine.parse(&envelope.content) {
        Ok(tree) => tree,
        Err(err) => {
            emit_parse_failure(&err, envelope, sink);
            return None;
        }
    };
    Some(analyze_tree(&tree, envelope, sink))
}

/// Walk an already-obtained syntax tree. The traverser converts any internal
/// fault into a single `unexpected_exception` finding.
pub fn analyze_tree(
    tree: &ast::SyntaxNode,
    envelope: &SourceEnvelope,
    sink: &mut dyn FindingSink,
) -> FinalContext {
    Traverser::new(&envelope.filename, &envelope.flags, sink).run(tree)
}

fn emit_parse_failure(
    err: &bridge::ParseError,
    envelope: &SourceEnvelope,
    sink: &mut dyn FindingSink,
) {
    let (id, severity, message) = match err.kind() {
        FailureKind::Syntax => (
            FindingId("javascript", "parse", "syntax_error"),
            Severity::Warning,
            "JavaScript syntax error; file skipped",
        ),
        FailureKind::Recursion => (
            FindingId("javascript", "parse", "recursion_error"),
            Severity::Notice,
            "Parser recursion limit reached; file skipped, review manually",
        ),
        FailureKind::Tree => (
            FindingId("javascript", "parse", "retrieving_tree"),
            Severity::Error,
            "Could not retrieve a syntax tree for this file",
        ),
    };
    tracing::debug!(file = %envelope.filename, error = %err, "parse failed");
    sink.emit(Finding {
        id,
        severity,
        message: message.to_string(),
        description: err.to_string(),
        filename: envelope.filename.clone(),
        line: err.line().unwrap_or(0),
        column: 0,
        context: None,
    });
}

/// Options for a scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Path to config file (defaults to `.addonvet.toml` in the scan dir).
    pub config_path: Option<std::path::PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// CLI override for the fail_on threshold.
    pub fail_on_override: Option<Severity>,
    /// Mode flags applied to every file in the scan.
    pub flags: ModeFlags,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            format: OutputFormat::Console,
            fail_on_override: None,
            flags: ModeFlags::default(),
        }
    }
}

/// Complete scan report.
#[derive(Debug)]
pub struct ScanReport {
    pub target_name: String,
    pub findings: Vec<Finding>,
    pub verdict: PolicyVerdict,
}

fn is_script(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("js") | Some("jsm")
    )
}

/// Run a complete scan: discover script files, analyze each, apply policy.
pub fn scan(path: &Path, options: &ScanOptions) -> Result<ScanReport> {
    let config_path = options
        .config_path
        .clone()
        .unwrap_or_else(|| path.join(".addonvet.toml"));
    let mut config = Config::load(&config_path)?;

    if let Some(fail_on) = options.fail_on_override {
        config.policy.fail_on = fail_on;
    }

    let files: Vec<std::path::PathBuf> = if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        walkdir::WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_script(entry.path()))
            .map(|entry| entry.into_path())
            .collect()
    };

    let mut engine = JsEngine::new(config.engine_config());
    let mut sink = MemorySink::new();

    for file in &files {
        let content = match std::fs::read_to_string(file) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "unreadable file, skipping");
                continue;
            }
        };
        let envelope = SourceEnvelope {
            filename: file.display().to_string(),
            content,
            flags: options.flags.clone(),
        };
        analyze(&mut engine, &envelope, &mut sink);
    }
    engine.cleanup();

    let all_findings = sink.into_findings();
    let effective_findings = config.policy.apply(&all_findings);
    let verdict = config.policy.evaluate(&all_findings);

    let target_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ScanReport {
        target_name,
        findings: effective_findings,
        verdict,
    })
}

/// Render a scan report in the specified format.
pub fn render_report(report: &ScanReport, format: OutputFormat) -> Result<String> {
    output::render(
        &report.findings,
        &report.verdict,
        format,
        &report.target_name,
    )
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use serde_json::json;

    fn envelope() -> SourceEnvelope {
        SourceEnvelope {
            filename: "chrome/content/main.js".into(),
            content: String::new(),
            flags: ModeFlags::default(),
        }
    }

    /// End-to-end over the wire shape: a Parser-API JSON document (what the
    /// engine would send) through conversion and analysis.
    #[test]
    fn eval_call_in_wire_format_is_reported() {
        let doc = json!({
            "type": "Program",
            "body": [{
                "type": "ExpressionStatement",
                "expression": {
                    "type": "CallExpression",
                    "loc": {"start": {"line": 2, "column": 4}},
                    "callee": {"type": "Identifier", "name": "eval"},
                    "arguments": [{"type": "Literal", "value": "payload()"}]
                }
            }]
        });
        let tree = ast::SyntaxNode::from_json(&doc).unwrap();
        let mut sink = MemorySink::new();
        analyze_tree(&tree, &envelope(), &mut sink);
        assert_eq!(sink.findings.len(), 1);
        assert_eq!(
            sink.findings[0].id.to_string(),
            "javascript/call/dangerous_eval"
        );
        assert_eq!(sink.findings[0].line, 2);
        assert_eq!(sink.findings[0].filename, "chrome/content/main.js");
    }

    #[test]
    fn hoisting_property_holds_in_wire_format() {
        // foo = "first"; function test() { foo = "second"; } bar = foo;
        let assign = |target: &str, value: serde_json::Value| {
            json!({
                "type": "ExpressionStatement",
                "expression": {
                    "type": "AssignmentExpression",
                    "operator": "=",
                    "left": {"type": "Identifier", "name": target},
                    "right": value
                }
            })
        };
        let doc = json!({
            "type": "Program",
            "body": [
                assign("foo", json!({"type": "Literal", "value": "first"})),
                {
                    "type": "FunctionDeclaration",
                    "id": {"type": "Identifier", "name": "test"},
                    "params": [],
                    "body": {
                        "type": "BlockStatement",
                        "body": [assign("foo", json!({"type": "Literal", "value": "second"}))]
                    }
                },
                assign("bar", json!({"type": "Identifier", "name": "foo"})),
            ]
        });
        let tree = ast::SyntaxNode::from_json(&doc).unwrap();
        let mut sink = MemorySink::new();
        let ctx = analyze_tree(&tree, &envelope(), &mut sink);
        assert_eq!(ctx.global_string("bar").as_deref(), Some("first"));
        assert_eq!(ctx.global_string("foo").as_deref(), Some("second"));
    }

    #[cfg(unix)]
    mod with_fake_engine {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        fn write_engine(dir: &Path, response: &str) -> std::path::PathBuf {
            let script = dir.join("engine.sh");
            fs::write(
                &script,
                format!("#!/bin/sh\nwhile read line; do echo '{response}'; done\n"),
            )
            .unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            script
        }

        #[test]
        fn scan_directory_end_to_end() {
            let dir = tempfile::tempdir().unwrap();
            let response = r#"{"type":"Program","body":[{"type":"ExpressionStatement","expression":{"type":"CallExpression","loc":{"start":{"line":1,"column":0}},"callee":{"type":"Identifier","name":"eval"},"arguments":[{"type":"Literal","value":"x"}]}}]}"#;
            let engine = write_engine(dir.path(), response);
            fs::write(dir.path().join("main.js"), "eval(\"x\");").unwrap();
            fs::write(dir.path().join("notes.txt"), "not a script").unwrap();
            fs::write(
                dir.path().join(".addonvet.toml"),
                format!("[engine]\nprogram = \"{}\"\n", engine.display()),
            )
            .unwrap();

            let report = scan(dir.path(), &ScanOptions::default()).unwrap();
            assert_eq!(report.findings.len(), 1);
            assert!(!report.verdict.pass);
            assert_eq!(
                report.findings[0].id.to_string(),
                "javascript/call/dangerous_eval"
            );
        }

        #[test]
        fn syntax_error_envelope_becomes_warning_finding() {
            let dir = tempfile::tempdir().unwrap();
            let response = r#"{"error": true, "error_message": "SyntaxError: missing ; before statement", "line_number": 9}"#;
            let engine = write_engine(dir.path(), response);
            fs::write(dir.path().join("broken.js"), "var a = ;").unwrap();
            fs::write(
                dir.path().join(".addonvet.toml"),
                format!("[engine]\nprogram = \"{}\"\n", engine.display()),
            )
            .unwrap();

            let report = scan(dir.path(), &ScanOptions::default()).unwrap();
            assert_eq!(report.findings.len(), 1);
            let finding = &report.findings[0];
            assert_eq!(finding.id.to_string(), "javascript/parse/syntax_error");
            assert_eq!(finding.severity, Severity::Warning);
            assert_eq!(finding.line, 9);
            // A skipped file does not fail the default policy.
            assert!(report.verdict.pass);
        }

        #[test]
        fn engine_fault_becomes_retrieving_tree_error() {
            let dir = tempfile::tempdir().unwrap();
            let script = dir.path().join("engine.sh");
            fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
            fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
            fs::write(dir.path().join("main.js"), "var ok = 1;").unwrap();
            fs::write(
                dir.path().join(".addonvet.toml"),
                format!("[engine]\nprogram = \"{}\"\n", script.display()),
            )
            .unwrap();

            let report = scan(dir.path(), &ScanOptions::default()).unwrap();
            assert_eq!(report.findings.len(), 1);
            assert_eq!(
                report.findings[0].id.to_string(),
                "javascript/parse/retrieving_tree"
            );
            assert_eq!(report.findings[0].severity, Severity::Error);
        }
    }
}
