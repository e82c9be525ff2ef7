//! The router: top-level dispatch entry point.
//!
//! A [`Router`] owns the command registry, the middleware pipeline, the
//! prefix policy, the rate limiter, and the named-storage facility. The
//! host transport invokes [`dispatch`](Router::dispatch) once per inbound
//! message; dispatch is stateless per event and safe under arbitrary
//! concurrent invocation — registration (`register`, `middleware`,
//! `init_storage`) happens during setup, before concurrent dispatch
//! begins.
//!
//! Per event the router: drops messages from itself (and, by default, from
//! any bot-flagged author); answers a bare mention of itself through the
//! configured ping handler; matches and strips one of its prefixes (a miss
//! is silently ignored so the bot does not cross-talk with other tools in
//! the channel); tokenizes the remainder; resolves the command tree; and
//! runs the middleware pipeline to completion. Handler and middleware
//! failures are recovered here — one failing invocation never affects the
//! dispatch loop or concurrently-dispatched invocations.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{Instrument, Level, debug, span, trace};

use tempo_core::{MessageEvent, Session};

use crate::args::Arguments;
use crate::command::{Command, CommandRegistry};
use crate::context::Context;
use crate::error::{Abort, CommandResult};
use crate::middleware::{Middleware, Pipeline, PipelineOutcome};
use crate::ratelimit::RateLimiter;
use crate::storage::{NamedStorage, Store};

/// Default idle interval after which an untouched rate-limit bucket may be
/// reclaimed.
pub const DEFAULT_BUCKET_TTL: Duration = Duration::from_secs(30 * 60);

/// Handler invoked when the message is exactly a mention of the bot.
type PingHandler = Arc<dyn Fn(MessageEvent, Arc<dyn Session>) -> BoxFuture<'static, ()> + Send + Sync>;

/// What the router did with one inbound event.
#[derive(Debug)]
pub enum Outcome {
    /// Authored by the bot itself or a bot-flagged account; dropped.
    IgnoredAuthor,
    /// The message was a bare self-mention; the ping handler ran.
    Ping,
    /// No configured prefix matched; silently ignored.
    NoPrefix,
    /// A prefix matched but nothing followed it.
    Empty,
    /// The first token named no registered command; silently ignored.
    NotCommand,
    /// A pre-stage middleware stopped the chain before the handler.
    Aborted(Abort),
    /// The handler ran; its result is carried here.
    Completed(CommandResult),
}

/// The dispatch engine's top-level object.
///
/// Built once at setup with the consuming-builder methods, wrapped in an
/// [`Arc`], and handed to the transport layer.
pub struct Router {
    prefixes: Vec<String>,
    case_insensitive_prefix: bool,
    ignore_bot_authors: bool,
    self_id: Option<String>,
    ping_handler: Option<PingHandler>,
    registry: CommandRegistry,
    pipeline: Pipeline,
    limiter: Arc<RateLimiter>,
    storage: NamedStorage,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a router with no prefixes or commands, ignoring bot-flagged
    /// authors, with the default bucket TTL.
    pub fn new() -> Self {
        Self {
            prefixes: Vec::new(),
            case_insensitive_prefix: false,
            ignore_bot_authors: true,
            self_id: None,
            ping_handler: None,
            registry: CommandRegistry::new(),
            pipeline: Pipeline::new(),
            limiter: Arc::new(RateLimiter::new(DEFAULT_BUCKET_TTL)),
            storage: NamedStorage::new(),
        }
    }

    /// Adds a command prefix. Earlier prefixes are tried first.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Makes prefix matching case-insensitive.
    pub fn case_insensitive_prefix(mut self, yes: bool) -> Self {
        self.case_insensitive_prefix = yes;
        self
    }

    /// Whether messages from bot-flagged authors are dropped (default
    /// `true`). The bot's own messages are always dropped once
    /// [`identity`](Self::identity) is set.
    pub fn ignore_bot_authors(mut self, yes: bool) -> Self {
        self.ignore_bot_authors = yes;
        self
    }

    /// Sets the bot's own user id, enabling self-message filtering and the
    /// self-mention ping pattern.
    pub fn identity(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = Some(self_id.into());
        self
    }

    /// Sets the handler run when a message is exactly a mention of the bot
    /// (`<@id>` / `<@!id>`), bypassing tokenization and resolution.
    pub fn ping_handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(MessageEvent, Arc<dyn Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ping_handler = Some(Arc::new(move |event, session| {
            Box::pin(f(event, session))
        }));
        self
    }

    /// Registers a top-level command.
    pub fn register(mut self, command: Command) -> Self {
        self.registry.register(command);
        self
    }

    /// Appends a middleware to the pipeline.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.push(Arc::new(middleware));
        self
    }

    /// Replaces the rate limiter (default: fresh limiter with
    /// [`DEFAULT_BUCKET_TTL`]). The same instance should be given to the
    /// [`RateLimit`](crate::middleware::RateLimit) middleware.
    pub fn rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Initialises a named store for cross-invocation handler state.
    pub fn init_storage(self, name: impl Into<String>) -> Self {
        self.storage.init(name);
        self
    }

    /// The shared rate limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetches a named store initialised at setup.
    pub fn storage(&self, name: &str) -> Option<Store> {
        self.storage.get(name)
    }

    /// Registered top-level commands.
    pub fn commands(&self) -> &[Arc<Command>] {
        self.registry.commands()
    }

    /// Dispatches one inbound event. Safe to call concurrently from any
    /// number of tasks.
    pub async fn dispatch(
        self: &Arc<Self>,
        event: MessageEvent,
        session: Arc<dyn Session>,
    ) -> Outcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            author = %event.author_id,
            scope = %event.scope_id,
        );
        self.dispatch_inner(event, session).instrument(span).await
    }

    async fn dispatch_inner(
        self: &Arc<Self>,
        event: MessageEvent,
        session: Arc<dyn Session>,
    ) -> Outcome {
        if self.is_ignored_author(&event) {
            trace!("dropping event from ignored author");
            return Outcome::IgnoredAuthor;
        }

        if self.is_self_ping(&event) {
            if let Some(handler) = &self.ping_handler {
                debug!("answering self-mention ping");
                handler(event, session).await;
                return Outcome::Ping;
            }
        }

        let Some(remainder) = self.strip_prefix(&event.content) else {
            return Outcome::NoPrefix;
        };

        let remainder = remainder.trim();
        if remainder.is_empty() {
            return Outcome::Empty;
        }

        let args = Arguments::parse(remainder);
        let Some(resolved) = self.registry.resolve(&args) else {
            trace!(first = args.get(0), "no command matched, ignoring");
            return Outcome::NotCommand;
        };

        debug!(
            command = %resolved.path,
            args = resolved.args.raw(),
            "command resolved"
        );
        let ctx = Arc::new(Context::new(
            resolved.args,
            resolved.command,
            resolved.path,
            Arc::clone(self),
            event,
            session,
        ));

        match self.pipeline.run(ctx).await {
            PipelineOutcome::Aborted(abort) => Outcome::Aborted(abort),
            PipelineOutcome::Completed(result) => Outcome::Completed(result),
        }
    }

    fn is_ignored_author(&self, event: &MessageEvent) -> bool {
        if let Some(self_id) = &self.self_id {
            if event.author_id == *self_id {
                return true;
            }
        }
        self.ignore_bot_authors && event.is_from_bot
    }

    fn is_self_ping(&self, event: &MessageEvent) -> bool {
        let Some(self_id) = &self.self_id else {
            return false;
        };
        let content = event.content.trim();
        content == format!("<@{self_id}>") || content == format!("<@!{self_id}>")
    }

    /// Returns the text after the first matching prefix, or `None`.
    fn strip_prefix<'a>(&self, content: &'a str) -> Option<&'a str> {
        for prefix in &self.prefixes {
            if self.case_insensitive_prefix {
                if let Some(head) = content.get(..prefix.len()) {
                    if head.eq_ignore_ascii_case(prefix) {
                        return Some(&content[prefix.len()..]);
                    }
                }
            } else if let Some(rest) = content.strip_prefix(prefix.as_str()) {
                return Some(rest);
            }
        }
        None
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("prefixes", &self.prefixes)
            .field("commands", &self.registry.commands().len())
            .field("middleware", &self.pipeline.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use tempo_core::{ReplyPayload, SessionResult};

    use crate::command::RatePolicy;
    use crate::middleware::RateLimit;

    /// Session that records every text sent through it.
    #[derive(Default)]
    struct RecordingSession {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingSession {
        fn texts(&self) -> Vec<String> {
            self.sent.lock().iter().map(|(_, t)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Session for RecordingSession {
        async fn send_text(&self, channel_id: &str, text: &str) -> SessionResult {
            self.sent
                .lock()
                .push((channel_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_reply(&self, channel_id: &str, payload: &ReplyPayload) -> SessionResult {
            self.sent
                .lock()
                .push((channel_id.to_string(), payload.description.clone()));
            Ok(())
        }

        async fn add_reaction(&self, _c: &str, _m: &str, _e: &str) -> SessionResult {
            Ok(())
        }

        async fn remove_reaction(&self, _c: &str, _m: &str, _e: &str) -> SessionResult {
            Ok(())
        }
    }

    fn event(content: &str) -> MessageEvent {
        MessageEvent::new("u1", "g1", "c1", "m1", content)
    }

    fn counting_command(name: &str, counter: &Arc<AtomicUsize>) -> Command {
        let counter = Arc::clone(counter);
        Command::new(name).handler(move |_ctx| {
            let c = Arc::clone(&counter);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_dispatch_resolves_and_runs_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .register(counting_command("pom", &counter)),
        );

        let outcome = router
            .dispatch(event("!pom 25"), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::Completed(Ok(()))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_prefix_is_silent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .register(counting_command("pom", &counter)),
        );

        let outcome = router
            .dispatch(event("pom 25"), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::NoPrefix));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent() {
        let router = Arc::new(Router::new().prefix("!"));
        let session = Arc::new(RecordingSession::default());
        let outcome = router.dispatch(event("!weather"), Arc::clone(&session) as _).await;
        assert!(matches!(outcome, Outcome::NotCommand));
        assert!(session.texts().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_only_is_empty() {
        let router = Arc::new(Router::new().prefix("!"));
        let outcome = router
            .dispatch(event("!   "), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::Empty));
    }

    #[tokio::test]
    async fn test_case_insensitive_prefix() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(
            Router::new()
                .prefix("pom!")
                .case_insensitive_prefix(true)
                .register(counting_command("start", &counter)),
        );

        let outcome = router
            .dispatch(event("POM!start"), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::Completed(Ok(()))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bot_authors_dropped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .identity("42")
                .register(counting_command("pom", &counter)),
        );
        let session = Arc::new(RecordingSession::default());

        let from_bot = event("!pom").from_bot();
        assert!(matches!(
            router.dispatch(from_bot, Arc::clone(&session) as _).await,
            Outcome::IgnoredAuthor
        ));

        let mut from_self = event("!pom");
        from_self.author_id = "42".into();
        assert!(matches!(
            router.dispatch(from_self, Arc::clone(&session) as _).await,
            Outcome::IgnoredAuthor
        ));

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_self_ping_bypasses_resolution() {
        let pinged = Arc::new(AtomicUsize::new(0));
        let pinged_clone = Arc::clone(&pinged);
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .identity("42")
                .ping_handler(move |event, session| {
                    let p = Arc::clone(&pinged_clone);
                    async move {
                        p.fetch_add(1, Ordering::SeqCst);
                        let _ = session.send_text(&event.channel_id, "pong").await;
                    }
                }),
        );
        let session = Arc::new(RecordingSession::default());

        let outcome = router
            .dispatch(event("<@42>"), Arc::clone(&session) as _)
            .await;
        assert!(matches!(outcome, Outcome::Ping));
        assert_eq!(pinged.load(Ordering::SeqCst), 1);
        assert_eq!(session.texts(), ["pong"]);

        // Nickname-style mention works too.
        let outcome = router
            .dispatch(event(" <@!42> "), Arc::clone(&session) as _)
            .await;
        assert!(matches!(outcome, Outcome::Ping));
    }

    #[tokio::test]
    async fn test_subcommand_dispatch_gets_remaining_args() {
        let seen = Arc::new(Mutex::new(String::new()));
        let seen_clone = Arc::clone(&seen);
        let router = Arc::new(
            Router::new().prefix("!").register(
                Command::new("task").subcommand(Command::new("add").handler(move |ctx| {
                    let seen = Arc::clone(&seen_clone);
                    async move {
                        *seen.lock() = ctx.args().raw().to_string();
                        Ok(())
                    }
                })),
            ),
        );

        router
            .dispatch(
                event("!task add water the plants"),
                Arc::new(RecordingSession::default()),
            )
            .await;
        assert_eq!(*seen.lock(), "water the plants");
    }

    #[tokio::test]
    async fn test_handler_error_is_recovered() {
        let router = Arc::new(Router::new().prefix("!").register(
            Command::new("bad").handler(|_ctx| async {
                Err(crate::error::CommandError::other("downstream broke"))
            }),
        ));

        let outcome = router
            .dispatch(event("!bad"), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::Completed(Err(_))));

        // The router is still fully usable afterwards.
        let outcome = router
            .dispatch(event("!bad"), Arc::new(RecordingSession::default()))
            .await;
        assert!(matches!(outcome, Outcome::Completed(Err(_))));
    }

    #[tokio::test]
    async fn test_end_to_end_rate_limited_flow() {
        let counter = Arc::new(AtomicUsize::new(0));
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(600)));
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .rate_limiter(Arc::clone(&limiter))
                .middleware(RateLimit::new(limiter).notifier(|ctx, retry| async move {
                    let _ = ctx
                        .reply(&format!("slow down, retry in {}ms", retry.as_millis()))
                        .await;
                }))
                .register(
                    counting_command("pom", &counter)
                        .rate_limit(RatePolicy::new(1, Duration::from_millis(50))),
                ),
        );
        let session = Arc::new(RecordingSession::default());

        // First invocation drains the single-token bucket.
        let outcome = router
            .dispatch(event("!pom 25"), Arc::clone(&session) as _)
            .await;
        assert!(matches!(outcome, Outcome::Completed(Ok(()))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Immediate retry: denied, notifier replied, handler untouched.
        let outcome = router
            .dispatch(event("!pom 10"), Arc::clone(&session) as _)
            .await;
        assert!(matches!(
            outcome,
            Outcome::Aborted(Abort::RateLimited { .. })
        ));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(session.texts().len(), 1);
        assert!(session.texts()[0].starts_with("slow down"));

        // After a full restoration interval the bucket has a token again.
        tokio::time::sleep(Duration::from_millis(60)).await;
        let outcome = router
            .dispatch(event("!pom 10"), Arc::clone(&session) as _)
            .await;
        assert!(matches!(outcome, Outcome::Completed(Ok(()))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_dispatch_isolation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = Arc::new(
            Router::new()
                .prefix("!")
                .register(counting_command("pom", &counter)),
        );

        let mut handles = Vec::new();
        for i in 0..32 {
            let router = Arc::clone(&router);
            handles.push(tokio::spawn(async move {
                let mut ev = event("!pom");
                ev.author_id = format!("u{i}");
                router.dispatch(ev, Arc::new(RecordingSession::default())).await
            }));
        }
        for handle in handles {
            assert!(matches!(
                handle.await.unwrap(),
                Outcome::Completed(Ok(()))
            ));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[tokio::test]
    async fn test_named_storage_survives_across_invocations() {
        use serde_json::json;

        let router = Arc::new(
            Router::new()
                .prefix("!")
                .init_storage("help_pages")
                .register(Command::new("next").handler(|ctx| async move {
                    let store = ctx.storage("help_pages").expect("initialised at setup");
                    let key = format!(
                        "{}:{}:{}",
                        ctx.event().scope_id,
                        ctx.event().message_id,
                        ctx.event().author_id
                    );
                    let page = store.get(&key).and_then(|v| v.as_u64()).unwrap_or(0);
                    store.insert(key, json!(page + 1));
                    Ok(())
                })),
        );
        let session = Arc::new(RecordingSession::default());

        router.dispatch(event("!next"), Arc::clone(&session) as _).await;
        router.dispatch(event("!next"), Arc::clone(&session) as _).await;

        let store = router.storage("help_pages").unwrap();
        assert_eq!(store.get("g1:m1:u1"), Some(json!(2)));
    }
}
