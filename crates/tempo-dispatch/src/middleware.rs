//! Stage-tagged middleware pipeline.
//!
//! A [`Middleware`] declares the [`Stage`]s it participates in as a bitmask
//! (pre-handler, post-handler, or both). The [`Pipeline`] runs pre-stage
//! middleware in registration order; any of them can abort the chain, in
//! which case the handler never runs and no post-stage middleware runs
//! either. Once a handler attempt has been made, every post-stage
//! middleware runs exactly once — including when the handler itself failed,
//! so auditing and cleanup always observe the outcome.
//!
//! Rate limiting is the built-in pre-stage middleware ([`RateLimit`]): on
//! denial it invokes the configured notifier with the computed retry-after
//! and aborts the chain.

use std::ops::BitOr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, error};

use crate::command::LimitScope;
use crate::context::Context;
use crate::error::{Abort, CommandResult};
use crate::ratelimit::{BucketKey, RateLimiter};

/// Bitmask of pipeline stages a middleware runs in.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Stage(u8);

impl Stage {
    /// Runs before the handler; may abort the chain.
    pub const PRE: Stage = Stage(0b01);
    /// Runs after a handler attempt, whatever its outcome.
    pub const POST: Stage = Stage(0b10);

    /// Whether every stage in `other` is set in `self`.
    pub fn contains(self, other: Stage) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Stage {
    type Output = Stage;

    fn bitor(self, rhs: Stage) -> Stage {
        Stage(self.0 | rhs.0)
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.contains(Self::PRE), self.contains(Self::POST)) {
            (true, true) => write!(f, "Stage(PRE | POST)"),
            (true, false) => write!(f, "Stage(PRE)"),
            (false, true) => write!(f, "Stage(POST)"),
            (false, false) => write!(f, "Stage(none)"),
        }
    }
}

/// An interceptor in the dispatch pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Name used in logs and abort reports.
    fn name(&self) -> &'static str {
        "middleware"
    }

    /// The stage(s) this middleware participates in.
    fn stages(&self) -> Stage;

    /// Pre-handler hook. Returning an error aborts the chain: the handler
    /// and all post-stage middleware are skipped.
    async fn pre(&self, _ctx: &Arc<Context>) -> Result<(), Abort> {
        Ok(())
    }

    /// Post-handler hook. Runs once a handler attempt was made, with the
    /// handler's result.
    async fn post(&self, _ctx: &Arc<Context>, _result: &CommandResult) {}
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A pre-stage middleware stopped the chain; the handler never ran.
    Aborted(Abort),
    /// The handler ran (and post-stage middleware after it); its result is
    /// carried here.
    Completed(CommandResult),
}

/// The ordered middleware chain terminating in the command handler.
#[derive(Default)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware. Registration order is execution order in both
    /// stages.
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Number of registered middlewares.
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Whether the pipeline has no middleware.
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the pipeline to completion for one invocation.
    pub async fn run(&self, ctx: Arc<Context>) -> PipelineOutcome {
        for middleware in &self.middlewares {
            if !middleware.stages().contains(Stage::PRE) {
                continue;
            }
            if let Err(abort) = middleware.pre(&ctx).await {
                match &abort {
                    Abort::RateLimited { retry_after } => debug!(
                        command = ctx.command().name(),
                        user = %ctx.event().author_id,
                        ?retry_after,
                        "invocation rate limited"
                    ),
                    Abort::Failed { middleware, reason } => error!(
                        command = ctx.command().name(),
                        middleware, reason, "middleware aborted chain"
                    ),
                }
                return PipelineOutcome::Aborted(abort);
            }
        }

        let result = ctx.command().run(Arc::clone(&ctx)).await;
        if let Err(err) = &result {
            error!(
                command = ctx.command().name(),
                user = %ctx.event().author_id,
                error = %err,
                "command handler failed"
            );
        }

        for middleware in &self.middlewares {
            if middleware.stages().contains(Stage::POST) {
                middleware.post(&ctx, &result).await;
            }
        }

        PipelineOutcome::Completed(result)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware_count", &self.middlewares.len())
            .finish()
    }
}

/// Callback invoked instead of the handler when an invocation is denied.
pub type RateLimitNotifier =
    Arc<dyn Fn(Arc<Context>, Duration) -> BoxFuture<'static, ()> + Send + Sync>;

/// Pre-stage middleware enforcing each command's [`RatePolicy`]
/// (commands without a policy pass through untouched).
///
/// [`RatePolicy`]: crate::command::RatePolicy
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
    notifier: Option<RateLimitNotifier>,
}

impl RateLimit {
    /// Creates the middleware over a shared limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            notifier: None,
        }
    }

    /// Sets the callback run on denial, receiving the retry-after.
    pub fn notifier<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Context>, Duration) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.notifier = Some(Arc::new(move |ctx, retry| Box::pin(f(ctx, retry))));
        self
    }
}

#[async_trait]
impl Middleware for RateLimit {
    fn name(&self) -> &'static str {
        "ratelimit"
    }

    fn stages(&self) -> Stage {
        Stage::PRE
    }

    async fn pre(&self, ctx: &Arc<Context>) -> Result<(), Abort> {
        let Some(policy) = ctx.command().rate_policy().copied() else {
            return Ok(());
        };

        // Bucket identity is the resolved path, not the bare name: two
        // subcommands both called "start" under different parents must not
        // share a bucket (or each other's policy).
        let event = ctx.event();
        let key = match policy.scope {
            LimitScope::PerScope => {
                BucketKey::new(ctx.command_path(), &event.author_id, &event.scope_id)
            }
            LimitScope::Global => BucketKey::global(ctx.command_path(), &event.author_id),
        };

        let take = self.limiter.take(&key, &policy);
        if take.allowed {
            return Ok(());
        }

        if let Some(notifier) = &self.notifier {
            notifier(Arc::clone(ctx), take.retry_after).await;
        }
        Err(Abort::RateLimited {
            retry_after: take.retry_after,
        })
    }
}
