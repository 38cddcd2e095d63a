//! Bridge to the external script-parsing process.
//!
//! The engine is a child process speaking newline-delimited JSON: each
//! request is the full source text as one JSON string literal terminated by
//! a newline, each response one JSON value — either a syntax tree document
//! or an error envelope `{"error": true, "error_message": ..., "line_number": ...}`.
//!
//! Process lifecycle: `Absent → Starting → Ready ⇄ InFlight`, and back to
//! `Absent` on any I/O fault. The process is spawned lazily on the first
//! `parse` and reused across calls. A fault while in flight discards the
//! handle and surfaces the failure to the caller; the next `parse`
//! transparently re-spawns. There is no multiplexing on the wire, so a
//! `JsEngine` takes `&mut self` for the whole exchange.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;
use thiserror::Error;

use crate::ast::SyntaxNode;

/// How to start the parser process.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let program = std::env::var_os("ADDONVET_PARSER")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("addonvet-parser"));
        Self {
            program,
            args: Vec::new(),
        }
    }
}

/// Why a `parse` call failed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The engine replied with an error envelope. The process stays cached.
    #[error("engine reported: {message}")]
    Engine {
        message: String,
        line: Option<u32>,
    },
    /// Talking to the process failed; the handle has been discarded and the
    /// next call will spawn a fresh process.
    #[error("engine I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// The engine replied with something that is neither a tree nor an
    /// error envelope.
    #[error("malformed engine response: {0}")]
    Protocol(String),
}

/// Classification of a failure for the caller's finding taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The file does not parse; skip it with a warning.
    Syntax,
    /// The engine hit its own recursion limit; skip, flag for manual review.
    Recursion,
    /// Anything else that prevented obtaining a tree.
    Tree,
}

static SYNTAX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(Syntax|Reference)Error").unwrap());
static RECURSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"too much recursion|InternalError").unwrap());

impl ParseError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ParseError::Engine { message, .. } => {
                if RECURSION_RE.is_match(message) {
                    FailureKind::Recursion
                } else if SYNTAX_RE.is_match(message) {
                    FailureKind::Syntax
                } else {
                    FailureKind::Tree
                }
            }
            _ => FailureKind::Tree,
        }
    }

    pub fn line(&self) -> Option<u32> {
        match self {
            ParseError::Engine { line, .. } => *line,
            _ => None,
        }
    }
}

struct EngineProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Owns at most one parser process at a time.
pub struct JsEngine {
    config: EngineConfig,
    process: Option<EngineProcess>,
}

impl JsEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            process: None,
        }
    }

    /// Parse one source file into a syntax tree.
    pub fn parse(&mut self, source: &str) -> Result<SyntaxNode, ParseError> {
        self.ensure_process()?;
        let process = self.process.as_mut().expect("process present after spawn");

        let response = match exchange(process, source) {
            Ok(response) => response,
            Err(err) => {
                // Fault while in flight: straight back to Absent. Not
                // retried here; the next parse re-spawns.
                tracing::warn!(error = %err, "engine exchange failed, discarding process");
                self.discard();
                return Err(ParseError::Io(err));
            }
        };

        if let Some(envelope) = response.as_object() {
            if envelope.get("error").and_then(Json::as_bool) == Some(true) {
                let message = envelope
                    .get("error_message")
                    .and_then(Json::as_str)
                    .unwrap_or("unknown engine error")
                    .to_string();
                let line = envelope
                    .get("line_number")
                    .and_then(Json::as_u64)
                    .map(|l| l as u32);
                return Err(ParseError::Engine { message, line });
            }
        }

        SyntaxNode::from_json(&response)
            .ok_or_else(|| ParseError::Protocol("response is not a syntax tree".into()))
    }

    /// Forcibly terminate the engine process, returning to `Absent`.
    /// Safe to call at any time; re-acquisition is automatic.
    pub fn cleanup(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.child.kill();
            let _ = process.child.wait();
        }
    }

    fn ensure_process(&mut self) -> Result<(), ParseError> {
        if self.process.is_some() {
            return Ok(());
        }
        tracing::debug!(program = %self.config.program.display(), "starting engine process");
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        self.process = Some(EngineProcess {
            child,
            stdin,
            stdout,
        });
        Ok(())
    }

    fn discard(&mut self) {
        self.cleanup();
    }
}

impl Drop for JsEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// One request/response exchange. Any error here means the process can no
/// longer be trusted to stay in sync with the protocol.
fn exchange(process: &mut EngineProcess, source: &str) -> std::io::Result<Json> {
    let request = serde_json::to_string(source).expect("strings always encode");
    process.stdin.write_all(request.as_bytes())?;
    process.stdin.write_all(b"\n")?;
    process.stdin.flush()?;

    let mut line = String::new();
    let read = process.stdout.read_line(&mut line)?;
    if read == 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "engine closed its output",
        ));
    }
    serde_json::from_str(&line)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Install a fake engine: a shell script that logs each startup to
    /// `starts.log`, then runs `body`.
    fn fake_engine(dir: &Path, body: &str) -> EngineConfig {
        let script = dir.join("engine.sh");
        let log = dir.join("starts.log");
        let contents = format!(
            "#!/bin/sh\necho started >> {}\n{}\n",
            log.display(),
            body
        );
        fs::write(&script, contents).unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        EngineConfig {
            program: script,
            args: Vec::new(),
        }
    }

    fn startups(dir: &Path) -> usize {
        fs::read_to_string(dir.join("starts.log"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    const EMPTY_PROGRAM: &str = r#"{"type":"Program","body":[]}"#;

    #[test]
    fn process_is_reused_across_parses() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_engine(
            dir.path(),
            &format!("while read line; do echo '{EMPTY_PROGRAM}'; done"),
        );
        let mut engine = JsEngine::new(config);
        engine.parse("var a = 1;").unwrap();
        engine.parse("var b = 2;").unwrap();
        assert_eq!(startups(dir.path()), 1);
    }

    #[test]
    fn write_failure_respawns_on_next_parse() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("serve");
        let body = format!(
            "if [ ! -f {flag} ]; then exit 0; fi\nwhile read line; do echo '{EMPTY_PROGRAM}'; done",
            flag = flag.display()
        );
        let config = fake_engine(dir.path(), &body);
        let mut engine = JsEngine::new(config);

        // First engine exits immediately: the exchange fails and the handle
        // is discarded rather than retried.
        assert!(engine.parse("var a = 1;").is_err());

        fs::write(&flag, "").unwrap();
        engine.parse("var a = 1;").unwrap();
        assert_eq!(startups(dir.path()), 2);
    }

    #[test]
    fn read_failure_discards_cached_process() {
        let dir = tempfile::tempdir().unwrap();
        // Serves exactly one response, then exits.
        let config = fake_engine(dir.path(), &format!("read line\necho '{EMPTY_PROGRAM}'"));
        let mut engine = JsEngine::new(config);

        engine.parse("var a = 1;").unwrap();
        assert!(engine.parse("var b = 2;").is_err());
        // The broken handle must not be reused.
        engine.parse("var c = 3;").unwrap();
        assert_eq!(startups(dir.path()), 2);
    }

    #[test]
    fn error_envelope_keeps_process_alive() {
        let dir = tempfile::tempdir().unwrap();
        let envelope = r#"{"error": true, "error_message": "SyntaxError: missing ; before statement", "line_number": 3}"#;
        let config = fake_engine(
            dir.path(),
            &format!("while read line; do echo '{envelope}'; done"),
        );
        let mut engine = JsEngine::new(config);

        for _ in 0..2 {
            let err = engine.parse("var a = ;").unwrap_err();
            assert_eq!(err.kind(), FailureKind::Syntax);
            assert_eq!(err.line(), Some(3));
        }
        assert_eq!(startups(dir.path()), 1);
    }

    #[test]
    fn cleanup_forces_respawn() {
        let dir = tempfile::tempdir().unwrap();
        let config = fake_engine(
            dir.path(),
            &format!("while read line; do echo '{EMPTY_PROGRAM}'; done"),
        );
        let mut engine = JsEngine::new(config);
        engine.parse("1;").unwrap();
        engine.cleanup();
        engine.parse("2;").unwrap();
        assert_eq!(startups(dir.path()), 2);
    }

    #[test]
    fn recursion_and_tree_failures_classify() {
        let recursion = ParseError::Engine {
            message: "InternalError: too much recursion".into(),
            line: None,
        };
        assert_eq!(recursion.kind(), FailureKind::Recursion);

        let other = ParseError::Engine {
            message: "something went sideways".into(),
            line: None,
        };
        assert_eq!(other.kind(), FailureKind::Tree);

        let io = ParseError::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe",
        ));
        assert_eq!(io.kind(), FailureKind::Tree);
    }
}
