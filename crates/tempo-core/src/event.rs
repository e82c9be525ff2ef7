//! The inbound message event.
//!
//! The transport collaborator delivers one [`MessageEvent`] per inbound
//! message; the dispatch engine consumes it and nothing else. The fields
//! mirror what every supported chat platform can provide: who wrote it,
//! where, the message identity, the raw text, and whether the author is a
//! bot account.

use serde::{Deserialize, Serialize};

/// A single inbound chat message, as delivered by the transport layer.
///
/// `scope_id` is the guild-like grouping the message arrived in (server,
/// workspace, group chat). It participates in rate-limit key identity; for
/// direct messages transports conventionally reuse the channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform id of the author.
    pub author_id: String,
    /// Guild-like grouping the message belongs to.
    pub scope_id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Platform id of the message itself.
    pub message_id: String,
    /// Raw message text.
    pub content: String,
    /// Whether the author is flagged as a bot account by the platform.
    pub is_from_bot: bool,
}

impl MessageEvent {
    /// Creates an event with the given identities and content.
    pub fn new(
        author_id: impl Into<String>,
        scope_id: impl Into<String>,
        channel_id: impl Into<String>,
        message_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            scope_id: scope_id.into(),
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            content: content.into(),
            is_from_bot: false,
        }
    }

    /// Marks the author as a bot account.
    pub fn from_bot(mut self) -> Self {
        self.is_from_bot = true;
        self
    }
}
