use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bridge::EngineConfig;
use crate::error::Result;
use crate::report::policy::Policy;

/// Top-level configuration from `.addonvet.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub engine: EngineSection,
}

/// `[engine]` section: how to start the parser process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSection {
    /// Parser executable. Falls back to `ADDONVET_PARSER` or the default
    /// program name when unset.
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Engine configuration with environment/default fallbacks applied.
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = EngineConfig::default();
        if let Some(program) = &self.engine.program {
            engine.program = program.clone();
        }
        if !self.engine.args.is_empty() {
            engine.args = self.engine.args.clone();
        }
        engine
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# addonvet configuration

[policy]
# Minimum severity to fail the scan (info, notice, warning, error).
fail_on = "error"

# Finding ids to ignore entirely.
# ignore = ["javascript/dom/document_write"]

# Per-finding severity overrides.
# [policy.overrides]
# "javascript/storage/synchronous_sql" = "notice"

[engine]
# Parser process. Defaults to $ADDONVET_PARSER, then "addonvet-parser".
# program = "/usr/local/bin/addonvet-parser"
# args = []
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/.addonvet.toml")).unwrap();
        assert_eq!(config.policy.fail_on, Severity::Error);
        assert!(config.policy.ignore.is_empty());
    }

    #[test]
    fn starter_config_round_trips() {
        let config: Config = toml::from_str(Config::starter_toml()).unwrap();
        assert_eq!(config.policy.fail_on, Severity::Error);
    }

    #[test]
    fn fail_on_and_engine_parse() {
        let config: Config = toml::from_str(
            r#"
            [policy]
            fail_on = "warning"
            ignore = ["javascript/dom/document_write"]

            [engine]
            program = "/opt/parser"
            args = ["--strict"]
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.fail_on, Severity::Warning);
        assert!(config
            .policy
            .ignore
            .contains("javascript/dom/document_write"));
        let engine = config.engine_config();
        assert_eq!(engine.program, PathBuf::from("/opt/parser"));
        assert_eq!(engine.args, vec!["--strict".to_string()]);
    }
}
