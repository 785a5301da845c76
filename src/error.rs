use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while loading, relabeling and delivering metrics.
///
/// Nothing in this crate exits the process; callers decide whether an error skips a
/// single source or aborts the whole cycle.
#[derive(Debug, Error)]
pub enum Error {
    /// A line of an exposition document could not be parsed.
    #[error("Malformed exposition in {origin} at line {line}: {reason}")]
    MalformedExposition {
        origin: String,
        line: usize,
        reason: String,
    },

    /// The relabel rules are contradictory or incomplete.
    #[error("Invalid relabel rule set: {0}")]
    InvalidRuleSet(String),

    /// A file or directory source is missing or unreadable.
    #[error("Source unavailable: {}: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Collector settings that don't make sense together.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to decode inventory: {0}")]
    Inventory(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn source_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::SourceUnavailable {
            path: path.into(),
            source,
        }
    }
}
