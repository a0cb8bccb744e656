//! Fatal error type shared by the parser, the configuration loader and the
//! conversion entry points.
use crate::output::ConfigError;
use thiserror::Error;

/// Main error type for conversions.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading a configuration directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output format description is unusable
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Group nesting exceeded the configured limit
    #[error("Input too complex: group nesting exceeds {limit} at byte {offset}")]
    ResourceExhausted {
        /// Maximum permitted nesting depth
        limit: usize,
        /// Byte offset of the group that crossed the limit
        offset: usize,
    },
}

impl Error {
    /// Whether the error stems from the output format configuration.
    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;
