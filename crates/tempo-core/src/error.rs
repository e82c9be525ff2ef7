//! Unified error types for tempo core components.
//!
//! Each collaborator surface gets its own error enum so that callers can
//! match on the failures they actually care about. Dispatch-level errors
//! (handler/middleware failures) live in `tempo-dispatch`.

use thiserror::Error;

/// Errors produced by a [`Session`](crate::session::Session) implementation.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The underlying connection is gone.
    #[error("session not connected")]
    NotConnected,

    /// A send was attempted and rejected by the platform.
    #[error("failed to send to channel '{channel_id}': {reason}")]
    SendFailed {
        /// Target channel of the failed send.
        channel_id: String,
        /// Platform-reported reason.
        reason: String,
    },

    /// A reaction add/remove was rejected.
    #[error("reaction '{emoji}' on message '{message_id}' failed: {reason}")]
    ReactionFailed {
        /// The emoji that could not be applied.
        emoji: String,
        /// The target message.
        message_id: String,
        /// Platform-reported reason.
        reason: String,
    },
}

/// Errors produced by a [`RecordStore`](crate::store::RecordStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No record exists for the given user.
    #[error("no record for user '{0}'")]
    NotFound(String),

    /// A record already exists where a create was attempted.
    #[error("record for user '{0}' already exists")]
    AlreadyExists(String),

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the session timer.
#[derive(Debug, Clone, Error)]
pub enum TimerError {
    /// A control call was made in a state that does not permit it.
    #[error("timer is {state}, cannot {op}")]
    InvalidState {
        /// Current state name.
        state: &'static str,
        /// The rejected operation.
        op: &'static str,
    },
}
