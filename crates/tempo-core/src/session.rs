//! The transport collaborator interface.
//!
//! A [`Session`] is whatever object the host uses to talk back to the chat
//! platform. The dispatch engine never constructs one; it receives a
//! `Arc<dyn Session>` alongside each event and hands it to command handlers
//! through the invocation context. Implementations own serialization,
//! connection state, and retries.

use async_trait::async_trait;

use crate::error::SessionError;

/// Result alias for session operations.
pub type SessionResult = Result<(), SessionError>;

/// A structured reply (embed-like) payload.
///
/// Rendering is entirely up to the session implementation; this type only
/// carries the data a handler wants shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyPayload {
    /// Optional title line.
    pub title: Option<String>,
    /// Main body text.
    pub description: String,
    /// Ordered name/value field pairs.
    pub fields: Vec<(String, String)>,
}

impl ReplyPayload {
    /// Creates a payload with just a body.
    pub fn text(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// Sets the title line.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Appends a name/value field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

/// Outbound surface of the chat platform connection.
///
/// All methods take `&self`; implementations are expected to be internally
/// synchronized and shared as `Arc<dyn Session>` across concurrent
/// dispatches.
#[async_trait]
pub trait Session: Send + Sync {
    /// Sends plain text to a channel.
    async fn send_text(&self, channel_id: &str, text: &str) -> SessionResult;

    /// Sends a structured reply to a channel.
    async fn send_reply(&self, channel_id: &str, payload: &ReplyPayload) -> SessionResult;

    /// Adds a reaction to a message. Used by paginated interfaces.
    async fn add_reaction(&self, channel_id: &str, message_id: &str, emoji: &str)
    -> SessionResult;

    /// Removes a previously added reaction.
    async fn remove_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> SessionResult;
}
