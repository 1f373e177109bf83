//! Error types for the stacktree crate
//!
//! Only the edges of the crate can fail: reading an event log and decoding
//! its lines. Reconciliation, tree building, projection and diffing are
//! infallible in-memory transitions.

use thiserror::Error;

/// Errors that can occur while reading or decoding an engine event log
#[derive(Error, Debug)]
pub enum Error {
    /// IO error while reading the log
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A log line was not valid JSON for an engine event
    #[error("invalid event on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A log line decoded but carried no recognised event payload
    #[error("unrecognised event on line {line}")]
    UnknownEvent { line: usize },
}

/// Result type for stacktree operations
pub type Result<T> = std::result::Result<T, Error>;
