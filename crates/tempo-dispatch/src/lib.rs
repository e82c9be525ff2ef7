//! # Tempo Dispatch
//!
//! The command-dispatch engine of the tempo bot: everything between an
//! inbound message event and a user-defined command handler.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌────────┐    ┌───────────┐    ┌──────────────────────┐
//! │ Transport │───▶│ Router │───▶│ Command   │───▶│ Pipeline             │
//! │ (Session) │    │ prefix │    │ tree      │    │ pre ─▶ handler ─▶ post│
//! └───────────┘    └────────┘    └───────────┘    └──────────────────────┘
//! ```
//!
//! - [`Router`] — the single entry point the transport invokes per inbound
//!   message: prefix matching, self-ping handling, bot-author filtering,
//!   and named storage for cross-invocation handler state.
//! - [`Arguments`] — tokenization with quoted spans, total positional
//!   indexing, mention and code-block extraction.
//! - [`Command`] / [`CommandRegistry`] — the nested command tree, resolved
//!   first-match in registration order.
//! - [`Middleware`] / [`Pipeline`] — stage-tagged interceptors wrapping the
//!   handler, with pre-stage short-circuiting.
//! - [`RateLimiter`] / [`RateLimit`] — lazy token buckets keyed by
//!   (command, user, scope), enforced as a pre-stage middleware.
//!
//! Everything on the dispatch path is safe under concurrent invocation:
//! registration happens at setup, dispatch is `&self` over interior-locked
//! maps with per-key granularity.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tempo_dispatch::{Command, RatePolicy, RateLimit, RateLimiter, Router};
//!
//! let limiter = Arc::new(RateLimiter::new(Duration::from_secs(1800)));
//! let router = Arc::new(
//!     Router::new()
//!         .prefix("!")
//!         .rate_limiter(Arc::clone(&limiter))
//!         .middleware(RateLimit::new(limiter).notifier(|ctx, retry| async move {
//!             let _ = ctx.reply(&format!("try again in {}s", retry.as_secs())).await;
//!         }))
//!         .register(
//!             Command::new("pom")
//!                 .alias("p")
//!                 .rate_limit(RatePolicy::new(1, Duration::from_secs(5)))
//!                 .handler(|ctx| async move {
//!                     ctx.reply("session started").await?;
//!                     Ok(())
//!                 }),
//!         ),
//! );
//!
//! // Per inbound event, from the transport callback:
//! // router.dispatch(event, session).await;
//! ```

pub mod args;
pub mod command;
pub mod context;
pub mod error;
pub mod middleware;
pub mod ratelimit;
pub mod router;
pub mod storage;

pub use args::{Arguments, CodeBlock, tokenize};
pub use command::{Command, CommandRegistry, LimitScope, RatePolicy, Resolved};
pub use context::Context;
pub use error::{Abort, CommandError, CommandResult};
pub use middleware::{Middleware, Pipeline, PipelineOutcome, RateLimit, RateLimitNotifier, Stage};
pub use ratelimit::{BucketKey, RateLimiter, Take};
pub use router::{DEFAULT_BUCKET_TTL, Outcome, Router};
pub use storage::{NamedStorage, Store};
