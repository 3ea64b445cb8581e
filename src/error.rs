use thiserror::Error;

use crate::level::LogLevelParseError;

#[derive(Debug, Error)]
pub enum LogError {
    /// No usable source location `depth` frames above the registration call.
    #[error("cannot determine source location at depth {depth}")]
    LocationUnavailable { depth: usize },

    #[error("log output: {0}")]
    Io(#[from] std::io::Error),

    #[error("logger config: {0}")]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Level(#[from] LogLevelParseError),
}
