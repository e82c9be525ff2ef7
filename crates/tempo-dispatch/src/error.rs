//! Error types for the dispatch engine.

use std::time::Duration;

use thiserror::Error;

use tempo_core::{SessionError, StoreError};

/// A command handler's business-logic failure.
///
/// Recovered at the dispatch boundary: logged, optionally surfaced to the
/// invoking user by the handler itself, never allowed to take down the
/// dispatch loop or other in-flight invocations.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// Replying through the session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A persistence call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The user supplied arguments the command cannot act on.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl CommandError {
    /// Creates an [`InvalidArguments`](Self::InvalidArguments) error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Creates an [`Other`](Self::Other) error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result alias for command handlers.
pub type CommandResult = Result<(), CommandError>;

/// Why a pre-stage middleware stopped the chain before the handler ran.
#[derive(Debug, Clone, Error)]
pub enum Abort {
    /// The rate limiter denied the invocation; the notifier has been told.
    #[error("rate limited, next token in {retry_after:?}")]
    RateLimited {
        /// Time until the bucket regenerates a token.
        retry_after: Duration,
    },

    /// The middleware itself failed (missing dependency, internal error).
    #[error("middleware '{middleware}' failed: {reason}")]
    Failed {
        /// Name of the failing middleware.
        middleware: &'static str,
        /// What went wrong.
        reason: String,
    },
}
