//! # Tempo
//!
//! A chat-bot engine for focus/study sessions, built around a concurrent
//! command-dispatch core.
//!
//! ```text
//! ┌───────────┐     ┌────────┐     ┌──────────────┐     ┌──────────┐
//! │ Transport │────▶│ Router │────▶│ Command tree │────▶│ Pipeline │──▶ handler
//! │ (Session) │     └────────┘     └──────────────┘     └──────────┘
//! └───────────┘       prefixes       name + aliases       pre / post
//! ```
//!
//! - `tempo-core`: the event model and the collaborator interfaces
//!   (session, record store, session timer).
//! - `tempo-dispatch`: the engine — tokenizer, command tree, invocation
//!   context, middleware pipeline, rate limiter, named storage.
//! - `tempo-runtime`: typed configuration and logging setup.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tempo::prelude::*;
//!
//! let config = ConfigLoader::new().load()?;
//! init_from_config(&config.logging);
//!
//! let router = Arc::new(
//!     Router::new()
//!         .prefix(&config.command.prefixes[0])
//!         .register(Command::new("pom").handler(|ctx| async move {
//!             ctx.reply("focus session started").await?;
//!             Ok(())
//!         })),
//! );
//! // Hand `router` to the transport: one `dispatch` call per inbound event.
//! ```

pub use tempo_core as core;
pub use tempo_dispatch as dispatch;
pub use tempo_runtime as runtime;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tempo_core::{
        MemoryStore, MessageEvent, RecordDelta, RecordStore, ReplyPayload, Session, SessionTimer,
        TimerHandle, TimerState, UserRecord,
    };
    pub use tempo_dispatch::{
        Arguments, Command, CommandError, CommandResult, Context, Middleware, Outcome, RateLimit,
        RateLimiter, RatePolicy, Router, Stage,
    };
    pub use tempo_runtime::{ConfigLoader, TempoConfig, init_from_config};
}
