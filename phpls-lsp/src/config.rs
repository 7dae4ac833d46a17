//! Server configuration, read from JSON.
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "diagnostics": { "enabled": true },
//!   "ctags": { "completion": { "keyword_length": 3 } },
//!   "log": { "enabled": false, "path": null, "level": "info" },
//!   "project_root": "/path/to/project"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub diagnostics: DiagnosticsConfig,
    pub ctags: CTagsConfig,
    pub log: LogConfig,
    /// Where the `tags` index lives.
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `json` is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::Config`] when its contents are not a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CTagsConfig {
    pub completion: CTagsCompletionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CTagsCompletionConfig {
    /// Names shorter than this are not looked up.
    pub keyword_length: usize,
}

impl Default for CTagsCompletionConfig {
    fn default() -> Self {
        Self { keyword_length: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// The level as a `tracing` filter directive.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_is_all_defaults() -> Result<(), Error> {
        let config = Config::from_json("{}")?;
        assert_eq!(config, Config::default());
        assert!(config.diagnostics.enabled);
        assert_eq!(config.ctags.completion.keyword_length, 3);
        assert!(!config.log.enabled);
        assert_eq!(config.log.level, LogLevel::Info);
        Ok(())
    }

    #[test]
    fn nested_overrides() -> Result<(), Error> {
        let config = Config::from_json(
            r#"{
                "diagnostics": { "enabled": false },
                "ctags": { "completion": { "keyword_length": 5 } },
                "log": { "enabled": true, "path": "/tmp/phpls.log", "level": "debug" },
                "project_root": "/srv/app"
            }"#,
        )?;
        assert!(!config.diagnostics.enabled);
        assert_eq!(config.ctags.completion.keyword_length, 5);
        assert_eq!(config.log.path, Some(PathBuf::from("/tmp/phpls.log")));
        assert_eq!(config.log.level.as_str(), "debug");
        assert_eq!(config.project_root, Some(PathBuf::from("/srv/app")));
        Ok(())
    }

    #[test]
    fn unknown_level_is_rejected() {
        assert!(matches!(
            Config::from_json(r#"{ "log": { "level": "trace" } }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/phpls.json"),
            Err(Error::Io(_))
        ));
    }
}
