//! Command definitions and the command tree.
//!
//! A [`Command`] couples an invoker (its name plus aliases), help text, an
//! optional rate-limit policy, an async handler, and an ordered list of
//! subcommands. The [`CommandRegistry`] holds the top-level commands and
//! resolves an argument list to the deepest matching node.
//!
//! # Resolution
//!
//! Resolution compares the first token against each command's declared
//! identifiers (name and aliases, under that command's case policy) in
//! registration order — first declared match wins, and matching is always
//! whole-identifier, never prefix. On a match the token is removed, the
//! remaining raw text is re-tokenized, and resolution recurses into the
//! subcommands with the next token. It stops at the deepest match; a miss
//! at the top level is `None`, which the router treats as "not a command"
//! rather than an error.
//!
//! # Alias collisions
//!
//! Sibling identifier collisions are not rejected: the earlier registration
//! wins at resolution time. [`CommandRegistry::register`] logs a warning
//! when a new command's identifiers shadow or are shadowed by an existing
//! sibling so the misconfiguration is visible.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use crate::args::Arguments;
use crate::context::Context;
use crate::error::CommandResult;

/// Scope of a rate-limit bucket's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitScope {
    /// One bucket per (command, user, scope): limits apply independently in
    /// each guild-like context.
    #[default]
    PerScope,
    /// One bucket per (command, user): limits follow the user everywhere.
    Global,
}

/// Rate-limit policy attached to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    /// Maximum tokens a bucket holds (and the seed for a fresh bucket).
    pub burst: u32,
    /// Time to regenerate one token.
    pub restoration: Duration,
    /// Which identities share a bucket.
    pub scope: LimitScope,
}

impl RatePolicy {
    /// Per-scope policy with the given burst and restoration interval.
    pub fn new(burst: u32, restoration: Duration) -> Self {
        Self {
            burst,
            restoration,
            scope: LimitScope::PerScope,
        }
    }

    /// Makes the bucket identity global (ignore the invoking scope).
    pub fn global(mut self) -> Self {
        self.scope = LimitScope::Global;
        self
    }
}

/// Boxed command handler: an async function over the invocation context.
pub type Handler = Arc<dyn Fn(Arc<Context>) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// One node of the command tree.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: String,
    usage: String,
    examples: Vec<String>,
    case_sensitive: bool,
    children: Vec<Arc<Command>>,
    rate_policy: Option<RatePolicy>,
    handler: Option<Handler>,
}

impl Command {
    /// Creates a command with the given primary name.
    ///
    /// By default matching is case-insensitive and there is no rate limit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: String::new(),
            usage: String::new(),
            examples: Vec::new(),
            case_sensitive: false,
            children: Vec::new(),
            rate_policy: None,
            handler: None,
        }
    }

    /// Adds an alternative invoker.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the help description.
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = text.into();
        self
    }

    /// Sets the usage line.
    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = text.into();
        self
    }

    /// Adds a usage example.
    pub fn example(mut self, text: impl Into<String>) -> Self {
        self.examples.push(text.into());
        self
    }

    /// Makes invoker matching case-sensitive for this command.
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    /// Adds a subcommand. Order matters: earlier siblings win collisions.
    pub fn subcommand(mut self, child: Command) -> Self {
        if let Some(existing) = self
            .children
            .iter()
            .find(|c| child.identifiers().any(|id| c.matches(id)))
        {
            warn!(
                parent = %self.name,
                earlier = %existing.name,
                later = %child.name,
                "subcommand identifier collision, earlier sibling wins"
            );
        }
        self.children.push(Arc::new(child));
        self
    }

    /// Attaches a rate-limit policy.
    pub fn rate_limit(mut self, policy: RatePolicy) -> Self {
        self.rate_policy = Some(policy);
        self
    }

    /// Sets the async handler run when this command is resolved.
    pub fn handler<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.handler = Some(Arc::new(move |ctx| Box::pin(f(ctx))));
        self
    }

    /// Primary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternative invokers.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Help description.
    pub fn description_text(&self) -> &str {
        &self.description
    }

    /// Usage line.
    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    /// Usage examples.
    pub fn examples_text(&self) -> &[String] {
        &self.examples
    }

    /// Subcommands in declaration order.
    pub fn children(&self) -> &[Arc<Command>] {
        &self.children
    }

    /// Rate-limit policy, if any.
    pub fn rate_policy(&self) -> Option<&RatePolicy> {
        self.rate_policy.as_ref()
    }

    /// Whether `token` names this command, under its case policy. Always a
    /// whole-identifier comparison.
    pub fn matches(&self, token: &str) -> bool {
        if self.case_sensitive {
            self.identifiers().any(|id| id == token)
        } else {
            self.identifiers().any(|id| id.eq_ignore_ascii_case(token))
        }
    }

    fn identifiers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Runs the handler. A command without one (a pure grouping node)
    /// succeeds without doing anything.
    pub(crate) async fn run(&self, ctx: Arc<Context>) -> CommandResult {
        match &self.handler {
            Some(handler) => handler(ctx).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("case_sensitive", &self.case_sensitive)
            .field("children", &self.children.len())
            .field("rate_policy", &self.rate_policy)
            .finish_non_exhaustive()
    }
}

/// A successful resolution: the deepest matching command, its space-joined
/// primary-name path from the root, and the arguments left over for it.
///
/// The path uses primary names even when the command was invoked through an
/// alias, so it is a stable identity for the node — rate-limit buckets key
/// on it, since bare names are not unique across the tree.
#[derive(Debug)]
pub struct Resolved {
    pub command: Arc<Command>,
    pub path: String,
    pub args: Arguments,
}

/// Ordered collection of top-level commands.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<Command>>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a top-level command. Registration order is resolution
    /// order; identifier collisions with earlier commands are logged, and
    /// the earlier registration wins.
    pub fn register(&mut self, command: Command) {
        if let Some(existing) = self
            .commands
            .iter()
            .find(|c| command.identifiers().any(|id| c.matches(id)))
        {
            warn!(
                earlier = %existing.name,
                later = %command.name,
                "command identifier collision, earlier registration wins"
            );
        }
        self.commands.push(Arc::new(command));
    }

    /// Registered top-level commands in order.
    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }

    /// Resolves an argument list to the deepest matching command and the
    /// arguments left over for it. `None` means "not a command".
    pub fn resolve(&self, args: &Arguments) -> Option<Resolved> {
        let token = args.get(0);
        if token.is_empty() {
            return None;
        }
        let command = self.commands.iter().find(|c| c.matches(token))?;
        Some(descend(command, command.name().to_string(), strip_first(args)))
    }
}

/// Recurses into subcommands while the next token names a child.
fn descend(command: &Arc<Command>, path: String, args: Arguments) -> Resolved {
    let token = args.get(0);
    if !token.is_empty() {
        if let Some(child) = command.children().iter().find(|c| c.matches(token)) {
            let path = format!("{path} {}", child.name());
            return descend(child, path, strip_first(&args));
        }
    }
    Resolved {
        command: Arc::clone(command),
        path,
        args,
    }
}

/// Drops the first token and re-tokenizes the re-derived raw remainder.
fn strip_first(args: &Arguments) -> Arguments {
    let mut rest = args.clone();
    rest.remove(0);
    Arguments::parse(rest.raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(commands: Vec<Command>) -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        for c in commands {
            reg.register(c);
        }
        reg
    }

    #[test]
    fn test_resolve_by_name_and_alias() {
        let reg = registry(vec![Command::new("pom").alias("pomodoro")]);

        let hit = reg.resolve(&Arguments::parse("pom 25")).unwrap();
        assert_eq!(hit.command.name(), "pom");
        assert_eq!(hit.args.get(0), "25");

        // Alias invocation still yields the primary-name path.
        let hit = reg.resolve(&Arguments::parse("pomodoro")).unwrap();
        assert_eq!(hit.command.name(), "pom");
        assert_eq!(hit.path, "pom");
    }

    #[test]
    fn test_resolve_miss_is_none() {
        let reg = registry(vec![Command::new("pom")]);
        assert!(reg.resolve(&Arguments::parse("weather today")).is_none());
        assert!(reg.resolve(&Arguments::parse("")).is_none());
    }

    #[test]
    fn test_alias_never_prefix_matches_sibling() {
        // "p" must hit the command declaring it, not the "pom" sibling that
        // merely starts with it.
        let reg = registry(vec![
            Command::new("pom"),
            Command::new("pause").alias("p"),
        ]);

        let hit = reg.resolve(&Arguments::parse("p")).unwrap();
        assert_eq!(hit.command.name(), "pause");
        let hit = reg.resolve(&Arguments::parse("pom")).unwrap();
        assert_eq!(hit.command.name(), "pom");
        assert!(reg.resolve(&Arguments::parse("po")).is_none());
    }

    #[test]
    fn test_collision_first_registration_wins() {
        let reg = registry(vec![
            Command::new("stats").alias("s"),
            Command::new("stop").alias("s"),
        ]);
        let hit = reg.resolve(&Arguments::parse("s")).unwrap();
        assert_eq!(hit.command.name(), "stats");
    }

    #[test]
    fn test_case_insensitive_by_default() {
        let reg = registry(vec![Command::new("Pom")]);
        assert!(reg.resolve(&Arguments::parse("POM")).is_some());
        assert!(reg.resolve(&Arguments::parse("pom")).is_some());
    }

    #[test]
    fn test_case_sensitive_flag() {
        let reg = registry(vec![Command::new("Pom").case_sensitive(true)]);
        assert!(reg.resolve(&Arguments::parse("Pom")).is_some());
        assert!(reg.resolve(&Arguments::parse("pom")).is_none());
    }

    #[test]
    fn test_resolve_descends_into_subcommands() {
        let reg = registry(vec![
            Command::new("task")
                .subcommand(Command::new("add").alias("a"))
                .subcommand(Command::new("list")),
        ]);

        let hit = reg.resolve(&Arguments::parse("task add write notes")).unwrap();
        assert_eq!(hit.command.name(), "add");
        assert_eq!(hit.path, "task add");
        assert_eq!(hit.args.tokens(), ["write", "notes"]);
        assert_eq!(hit.args.raw(), "write notes");

        let hit = reg.resolve(&Arguments::parse("task a x")).unwrap();
        assert_eq!(hit.command.name(), "add");
        assert_eq!(hit.path, "task add");
        assert_eq!(hit.args.get(0), "x");
    }

    #[test]
    fn test_path_distinguishes_same_named_subcommands() {
        let reg = registry(vec![
            Command::new("pom").subcommand(Command::new("start")),
            Command::new("break").subcommand(Command::new("start")),
        ]);

        let a = reg.resolve(&Arguments::parse("pom start")).unwrap();
        let b = reg.resolve(&Arguments::parse("break start")).unwrap();
        assert_eq!(a.command.name(), "start");
        assert_eq!(b.command.name(), "start");
        assert_eq!(a.path, "pom start");
        assert_eq!(b.path, "break start");
    }

    #[test]
    fn test_resolve_stops_at_deepest_match() {
        let reg = registry(vec![Command::new("task").subcommand(Command::new("add"))]);

        // Next token names no child: the parent is the match.
        let hit = reg.resolve(&Arguments::parse("task remove 3")).unwrap();
        assert_eq!(hit.command.name(), "task");
        assert_eq!(hit.args.tokens(), ["remove", "3"]);

        // No tokens remain: parent again.
        let hit = reg.resolve(&Arguments::parse("task")).unwrap();
        assert_eq!(hit.command.name(), "task");
        assert!(hit.args.is_empty());
    }

    #[test]
    fn test_descent_retokenizes_remainder() {
        let reg = registry(vec![Command::new("task").subcommand(Command::new("add"))]);

        // The quoted span survives top-level parsing but is re-split during
        // descent; the re-derived raw string is the observable contract.
        let hit = reg
            .resolve(&Arguments::parse(r#"task add "big rock""#))
            .unwrap();
        assert_eq!(hit.command.name(), "add");
        assert_eq!(hit.args.tokens(), ["big", "rock"]);
    }
}
