//! Structured logging with module relative caller locations.
//!
//! Every record carries the `file:line` it was logged from. Paths are cut
//! down to the longest registered module root (see
//! [`Logger::add_caller_src_path_prefix`]) and the rendering is cached per
//! call site. Fields come out in a fixed order: `time`, `level`, `comp`,
//! `file`, `func`, the remaining fields by name, then `msg`.

mod args;
mod caller;
mod config;
mod error;
mod field_order;
mod format;
mod level;
mod logger;
mod logs;
mod prefix;
pub mod testutils;

pub use args::LoggerArgs;
pub use caller::{CallSiteKey, CallStack, CallerResolver, Frame, FunctionNames, RenderedLocation};
pub use config::LoggerConfig;
pub use error::LogError;
pub use field_order::{
    compare_field_keys, field_rank, sort_field_keys, FIELD_COMPONENT, FIELD_FILE, FIELD_FUNC, FIELD_LEVEL, FIELD_MSG,
    FIELD_TIME,
};
pub use format::Field;
pub use level::{LogLevel, LogLevelParseError};
pub use logger::{CompLogger, Logger};
pub use logs::Log;
pub use prefix::{PrefixTrimCache, DEFAULT_KEEP_DIRS};

pub(crate) fn trim_fn_path(path: &str) -> &str {
    if let Some((_, result)) = path.rsplit_once("::") {
        return result;
    }
    path
}

/// Names of all levels, lowest first.
pub fn log_level_names() -> &'static [&'static str] {
    &LogLevel::NAMES
}
