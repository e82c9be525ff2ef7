//! Focus Bot Example
//!
//! A console bot wiring the whole tempo stack together: configuration,
//! logging, the router with a nested `pom` command tree, per-user rate
//! limiting, the in-memory record store, and the pausable session timer.
//!
//! Every line you type is treated as one inbound message from a single
//! console user. Try:
//!
//! ```text
//! !pom start 25      # start a 25 minute focus session
//! !pom status        # how long is the current session?
//! !pom stop          # cancel it
//! !stats             # accumulated focus time
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package focus-bot
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use tempo::core::{SessionResult, StoreError};
use tempo::prelude::*;

/// Session that simply prints replies to stdout.
struct ConsoleSession;

#[async_trait]
impl Session for ConsoleSession {
    async fn send_text(&self, _channel_id: &str, text: &str) -> SessionResult {
        println!("[bot] {text}");
        Ok(())
    }

    async fn send_reply(&self, _channel_id: &str, payload: &ReplyPayload) -> SessionResult {
        if let Some(title) = &payload.title {
            println!("[bot] == {title} ==");
        }
        println!("[bot] {}", payload.description);
        for (name, value) in &payload.fields {
            println!("[bot]   {name}: {value}");
        }
        Ok(())
    }

    async fn add_reaction(&self, _c: &str, _m: &str, emoji: &str) -> SessionResult {
        println!("[bot] *reacts with {emoji}*");
        Ok(())
    }

    async fn remove_reaction(&self, _c: &str, _m: &str, _e: &str) -> SessionResult {
        Ok(())
    }
}

/// Active timers by user id.
type Sessions = Arc<Mutex<HashMap<String, TimerHandle>>>;

fn pom_command(store: MemoryStore, sessions: Sessions) -> Command {
    let start_store = store.clone();
    let start_sessions = Arc::clone(&sessions);
    let stop_sessions = Arc::clone(&sessions);
    let status_sessions = sessions;

    Command::new("pom")
        .alias("p")
        .description("Manage a focus session")
        .usage("pom start [minutes] | pom status | pom stop")
        .example("!pom start 25")
        .rate_limit(RatePolicy::new(2, Duration::from_secs(5)))
        .subcommand(
            Command::new("start").handler(move |ctx| {
                let store = start_store.clone();
                let sessions = Arc::clone(&start_sessions);
                async move {
                    let user = ctx.event().author_id.clone();
                    if sessions.lock().contains_key(&user) {
                        ctx.reply("you already have a session running").await?;
                        return Ok(());
                    }

                    let minutes: u64 = match ctx.args().get(0) {
                        "" => 25,
                        raw => raw.parse().map_err(|_| {
                            CommandError::invalid_arguments(format!("'{raw}' is not a number"))
                        })?,
                    };

                    if store.fetch_record(&user).await?.is_none() {
                        store.create_record(UserRecord::new(&user)).await?;
                    }

                    // Remember the length for `pom status`.
                    if let Some(meta) = ctx.storage("session_meta") {
                        meta.insert(user.clone(), json!(minutes));
                    }

                    let session = Arc::clone(ctx.session());
                    let channel = ctx.event().channel_id.clone();
                    let done_store = store.clone();
                    let done_sessions = Arc::clone(&sessions);
                    let done_user = user.clone();
                    let cancel_user = user.clone();
                    let cancel_sessions = Arc::clone(&sessions);

                    let handle = SessionTimer::start(
                        Duration::from_secs(minutes * 60),
                        Box::pin(async move {
                            let delta = RecordDelta {
                                focus_seconds: minutes * 60,
                                sessions_completed: 1,
                            };
                            match done_store.update_record(&done_user, delta).await {
                                Ok(rec) => {
                                    let _ = session
                                        .send_text(
                                            &channel,
                                            &format!(
                                                "session done! total focus: {} min",
                                                rec.focus_seconds / 60
                                            ),
                                        )
                                        .await;
                                }
                                Err(err) => info!(%err, "could not credit session"),
                            }
                            done_sessions.lock().remove(&done_user);
                        }),
                        Box::pin(async move {
                            cancel_sessions.lock().remove(&cancel_user);
                        }),
                    );

                    sessions.lock().insert(user, handle);
                    ctx.reply(&format!("focus session started: {minutes} min"))
                        .await?;
                    Ok(())
                }
            }),
        )
        .subcommand(Command::new("status").handler(move |ctx| {
            let sessions = Arc::clone(&status_sessions);
            async move {
                let user = &ctx.event().author_id;
                let state = sessions.lock().get(user).map(|h| h.state());
                let text = match state {
                    Some(TimerState::Running) => {
                        let minutes = ctx
                            .storage("session_meta")
                            .and_then(|meta| meta.get(user))
                            .and_then(|v| v.as_u64())
                            .unwrap_or(0);
                        format!("session running ({minutes} min)")
                    }
                    Some(TimerState::Paused) => "session paused".to_string(),
                    _ => "no session running".to_string(),
                };
                ctx.reply(&text).await?;
                Ok(())
            }
        }))
        .subcommand(Command::new("stop").alias("cancel").handler(move |ctx| {
            let sessions = Arc::clone(&stop_sessions);
            async move {
                let user = &ctx.event().author_id;
                let handle = sessions.lock().get(user).cloned();
                match handle {
                    Some(handle) => {
                        handle.cancel();
                        ctx.reply("session canceled").await?;
                    }
                    None => ctx.reply("no session to stop").await?,
                }
                Ok(())
            }
        }))
}

fn stats_command(store: MemoryStore) -> Command {
    Command::new("stats")
        .description("Show accumulated focus time")
        .handler(move |ctx| {
            let store = store.clone();
            async move {
                let user = &ctx.event().author_id;
                let record = match store.fetch_record(user).await {
                    Ok(Some(rec)) => rec,
                    Ok(None) | Err(StoreError::NotFound(_)) => {
                        ctx.reply("no sessions recorded yet").await?;
                        return Ok(());
                    }
                    Err(err) => return Err(err.into()),
                };

                let payload = ReplyPayload::text("your focus stats")
                    .title("stats")
                    .field("total focus", format!("{} min", record.focus_seconds / 60))
                    .field("sessions", record.sessions_completed.to_string());
                ctx.reply_payload(&payload).await?;
                Ok(())
            }
        })
}

#[tokio::main]
async fn main() {
    let config = ConfigLoader::new().load().unwrap_or_default();
    init_from_config(&config.logging);

    let store = MemoryStore::new();
    let sessions: Sessions = Arc::new(Mutex::new(HashMap::new()));
    let prefix = config.command.primary_prefix();

    let limiter = Arc::new(RateLimiter::new(config.ratelimit.idle_ttl()));
    let router = Arc::new(
        Router::new()
            .prefix(prefix.clone())
            .case_insensitive_prefix(config.command.case_insensitive)
            .identity("1")
            .init_storage("session_meta")
            .rate_limiter(Arc::clone(&limiter))
            .middleware(RateLimit::new(limiter).notifier(|ctx, retry| async move {
                let _ = ctx
                    .reply(&format!("easy there, try again in {}s", retry.as_secs().max(1)))
                    .await;
            }))
            .ping_handler(|event, session| async move {
                let _ = session.send_text(&event.channel_id, "pong").await;
            })
            .register(pom_command(store.clone(), sessions))
            .register(stats_command(store)),
    );

    let session: Arc<dyn Session> = Arc::new(ConsoleSession);
    info!(%prefix, "focus-bot ready, type a command");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0u64;
    while let Ok(Some(line)) = lines.next_line().await {
        message_id += 1;
        let event = MessageEvent::new(
            "console-user",
            "console",
            "console",
            message_id.to_string(),
            line,
        );
        router.dispatch(event, Arc::clone(&session)).await;
    }
}
