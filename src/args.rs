//! Logger flags, meant to be flattened into the application's parser:
//!
//! ```no_run
//! #[derive(clap::Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     log: callsite_log::LoggerArgs,
//! }
//! ```

use clap::Args;

use crate::{LoggerConfig, LogLevel};

#[derive(Debug, Clone, Default, Args)]
pub struct LoggerArgs {
    /// Structure the logged record in JSON
    #[arg(long = "log-use-json", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub use_json: Option<bool>,

    /// Log level name, one of trace, debug, info, warn, error
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub level: Option<LogLevel>,

    /// Disable the reporting of the source file:line# info
    #[arg(long = "log-disable-src-file", value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub disable_src_file: Option<bool>,

    /// Log to a file or use stdout/stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<String>,

    /// Directories to keep in front of file names outside the module roots
    #[arg(long = "log-src-keep-dirs", value_name = "N")]
    pub src_keep_dirs: Option<usize>,
}

impl LoggerArgs {
    /// Override `cfg` with the flags given on the command line only.
    pub fn apply_to(&self, cfg: &mut LoggerConfig) {
        if let Some(use_json) = self.use_json {
            cfg.use_json = use_json;
        }
        if let Some(level) = self.level {
            cfg.level = level;
        }
        if let Some(disable) = self.disable_src_file {
            cfg.disable_src_file = disable;
        }
        if let Some(log_file) = &self.log_file {
            cfg.log_file = log_file.clone();
        }
        if self.src_keep_dirs.is_some() {
            cfg.src_keep_dirs = self.src_keep_dirs;
        }
    }

    pub fn to_config(&self) -> LoggerConfig {
        let mut cfg = LoggerConfig::default();
        self.apply_to(&mut cfg);
        cfg
    }
}
