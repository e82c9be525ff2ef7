//! # Tempo Core
//!
//! Core event model and collaborator interfaces for the tempo engine.
//!
//! This crate defines everything the dispatch engine consumes or hands to
//! command handlers without owning the implementation:
//!
//! - **Event model**: the inbound [`MessageEvent`] tuple delivered by the
//!   transport layer.
//! - **Session**: the outbound platform surface ([`Session`],
//!   [`ReplyPayload`]) — sending text, structured replies, and reactions.
//! - **Record store**: per-user accumulated study records
//!   ([`RecordStore`], [`UserRecord`], with [`MemoryStore`] as the
//!   in-process reference implementation).
//! - **Session timer**: the pausable focus/break interval state machine
//!   ([`SessionTimer`], [`TimerHandle`]).
//!
//! The dispatch engine itself (prefix matching, command tree, middleware
//! pipeline, rate limiting) lives in `tempo-dispatch`.

pub mod error;
pub mod event;
pub mod session;
pub mod store;
pub mod timer;

pub use error::{SessionError, StoreError, StoreResult, TimerError};
pub use event::MessageEvent;
pub use session::{ReplyPayload, Session, SessionResult};
pub use store::{MemoryStore, RecordDelta, RecordStore, UserRecord};
pub use timer::{SessionTimer, TimerHandle, TimerState};
