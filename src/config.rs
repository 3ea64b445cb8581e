use std::path::Path;

use serde::Deserialize;

use crate::{LogError, LogLevel};

pub const DEFAULT_USE_JSON: bool = true;
pub const DEFAULT_DISABLE_SRC_FILE: bool = false;

/// Logger settings, usually read from the application's config file and
/// then amended by [`crate::LoggerArgs`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Render records as JSON objects instead of `key=value` text.
    pub use_json: bool,
    pub level: LogLevel,
    /// Drop the `file` field (and the caller lookup behind it).
    pub disable_src_file: bool,
    /// `"stderr"`, `"stdout"`, a file path, or empty to keep the current output.
    pub log_file: String,
    /// Directories kept in front of file names outside every registered prefix.
    pub src_keep_dirs: Option<usize>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            use_json: DEFAULT_USE_JSON,
            level: LogLevel::default(),
            disable_src_file: DEFAULT_DISABLE_SRC_FILE,
            log_file: String::new(),
            src_keep_dirs: None,
        }
    }
}

impl LoggerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, LogError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
