//! Logging setup over `tracing` / `tracing-subscriber`.
//!
//! # Configuration-based initialization
//!
//! ```rust,ignore
//! use tempo_runtime::{config::ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! # Manual initialization
//!
//! ```rust,ignore
//! use tempo_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new().directive("tempo_dispatch=debug").init();
//! ```

use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::config::LoggingConfig;

/// Initializes logging from a [`LoggingConfig`].
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builder for the global tracing subscriber.
#[derive(Debug, Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    with_target: bool,
}

impl LoggingBuilder {
    /// Creates a builder with target display enabled and no directives
    /// (the `RUST_LOG` variable, then `info`, supplies the filter).
    pub fn new() -> Self {
        Self {
            directives: Vec::new(),
            with_target: true,
        }
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            directives: vec![config.level.clone()],
            with_target: config.with_target,
        }
    }

    /// Adds a filter directive (e.g. `"tempo_dispatch=debug"`).
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Controls whether the event target is shown.
    pub fn with_target(mut self, yes: bool) -> Self {
        self.with_target = yes;
        self
    }

    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));
        for directive in &self.directives {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(err) => warn!(directive, %err, "ignoring bad log directive"),
            }
        }
        filter
    }

    /// Installs the subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.filter();
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .finish()
            .try_init()
    }

    /// Installs the subscriber, panicking if one is already set.
    pub fn init(self) {
        self.try_init().expect("logging already initialized");
    }
}
