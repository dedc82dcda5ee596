//! Custom error types for the recorder.
//!
//! This module defines `LogError`, the single error type returned by every
//! fallible recorder operation. Using the `thiserror` crate, each failure mode
//! gets its own variant so callers can tell "called twice" apart from
//! "wrong phase" or "name collision" without parsing messages.
//!
//! ## Error Hierarchy
//!
//! - **`AlreadyInitialized`**: `Recorder::initialize` was called a second time in this
//!   process. The existing recorder is unaffected.
//! - **`InvalidPhase`**: an operation was invoked in the wrong lifecycle phase, e.g.
//!   registering a topic after `finish_initialization` or logging before it.
//! - **`DuplicateName`** / **`EmptyName`**: registration was refused; the namespace is
//!   unchanged.
//! - **`UnknownTopic`**: data was published to a name that is not a subscribed topic.
//! - **`UninitializedValue`**: a queried topic was read before its first refresh.
//! - **`Io`**: opening or writing the output failed and the recorder runs with
//!   `IoErrorPolicy::Fail`. Under the default `IoErrorPolicy::Report` I/O failures are
//!   logged and surfaced as `LineOutcome::Dropped` instead.
//! - **`Config`** / **`InvalidConfig`**: configuration could not be loaded or failed
//!   validation.

use crate::recorder::Phase;
use thiserror::Error;

/// Convenience alias for results using the recorder error type.
pub type LogResult<T> = std::result::Result<T, LogError>;

/// Every way a recorder operation can fail.
#[derive(Error, Debug)]
pub enum LogError {
    /// A process-wide recorder already exists.
    #[error("Recorder has already been initialized in this process")]
    AlreadyInitialized,

    /// The operation is not allowed in the current lifecycle phase.
    #[error("'{operation}' is not allowed in the {phase} phase")]
    InvalidPhase {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Phase the recorder was in.
        phase: Phase,
    },

    /// The name is already taken by a topic or value.
    #[error("Name '{0}' is already registered")]
    DuplicateName(String),

    /// Registration was attempted with an empty name.
    #[error("Topic and value names must not be empty")]
    EmptyName,

    /// Data was published to a name that is not a subscribed topic.
    #[error("'{0}' is not a subscribed topic")]
    UnknownTopic(String),

    /// A queried topic was read before its first refresh.
    #[error("Queried topic '{0}' has not been refreshed yet")]
    UninitializedValue(String),

    /// Opening or writing the output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The configuration loaded but holds invalid values.
    #[error("Configuration validation error: {0}")]
    InvalidConfig(String),
}

impl LogError {
    /// Whether the recorder is still usable after this error.
    ///
    /// Lifecycle and naming errors reject a single call without touching
    /// recorder state. I/O and configuration errors mean the output or the
    /// recorder itself could not be set up as requested.
    pub fn can_recover(&self) -> bool {
        match self {
            LogError::InvalidPhase { .. }
            | LogError::DuplicateName(_)
            | LogError::EmptyName
            | LogError::UnknownTopic(_)
            | LogError::UninitializedValue(_) => true,
            LogError::AlreadyInitialized
            | LogError::Io(_)
            | LogError::Config(_)
            | LogError::InvalidConfig(_) => false,
        }
    }
}

impl From<figment::Error> for LogError {
    fn from(value: figment::Error) -> Self {
        LogError::Config(Box::new(value))
    }
}
