//! Per-invocation context.
//!
//! A [`Context`] is built by the router once a command has been resolved
//! and lives only for that pipeline run. It bundles the parsed arguments,
//! the triggering event, the resolved command, the outbound session, a
//! back-reference to the owning router (for named storage), and a fresh
//! typed scratch map that middleware and the handler can use to pass values
//! to each other. Scratch state is never reused across invocations.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use tempo_core::{MessageEvent, ReplyPayload, Session, SessionResult};

use crate::args::Arguments;
use crate::command::Command;
use crate::router::Router;
use crate::storage::Store;

/// The unit of state passed through the middleware pipeline to the handler.
pub struct Context {
    args: Arguments,
    command: Arc<Command>,
    command_path: String,
    router: Arc<Router>,
    event: MessageEvent,
    session: Arc<dyn Session>,
    /// Fresh per invocation. Keyed by type, one value per type.
    scratch: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Context {
    pub(crate) fn new(
        args: Arguments,
        command: Arc<Command>,
        command_path: String,
        router: Arc<Router>,
        event: MessageEvent,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            args,
            command,
            command_path,
            router,
            event,
            session,
            scratch: Mutex::new(HashMap::new()),
        }
    }

    /// Arguments remaining after command resolution.
    pub fn args(&self) -> &Arguments {
        &self.args
    }

    /// The resolved command.
    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    /// Space-joined primary-name path of the resolved command from the
    /// top-level command down, as computed by
    /// [`CommandRegistry::resolve`](crate::command::CommandRegistry::resolve).
    /// Unique across the tree where bare names are not.
    pub fn command_path(&self) -> &str {
        &self.command_path
    }

    /// The owning router.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// The event that triggered this invocation.
    pub fn event(&self) -> &MessageEvent {
        &self.event
    }

    /// The outbound session.
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Looks up a named store on the router. `None` if the name was never
    /// initialised at setup.
    pub fn storage(&self, name: &str) -> Option<Store> {
        self.router.storage(name)
    }

    /// Sends plain text to the channel the invocation came from.
    pub async fn reply(&self, text: &str) -> SessionResult {
        self.session.send_text(&self.event.channel_id, text).await
    }

    /// Sends a structured reply to the invocation's channel.
    pub async fn reply_payload(&self, payload: &ReplyPayload) -> SessionResult {
        self.session
            .send_reply(&self.event.channel_id, payload)
            .await
    }

    /// Stores a value in the invocation scratch map. One value per type;
    /// later calls overwrite.
    pub fn set_state<T: Send + Sync + 'static>(&self, value: T) {
        self.scratch.lock().insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a cloned value from the scratch map.
    pub fn get_state<T: Clone + 'static>(&self) -> Option<T> {
        self.scratch
            .lock()
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Whether a value of type `T` is present in the scratch map.
    pub fn has_state<T: 'static>(&self) -> bool {
        self.scratch.lock().contains_key(&TypeId::of::<T>())
    }

    /// Removes and returns a value from the scratch map.
    pub fn take_state<T: 'static>(&self) -> Option<T> {
        self.scratch
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("command", &self.command_path)
            .field("args", &self.args)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
