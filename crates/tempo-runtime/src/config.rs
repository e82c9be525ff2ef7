//! Typed configuration, loaded once at startup.
//!
//! Replaces runtime option lookups with a [`TempoConfig`] struct populated
//! from layered sources (lowest to highest priority):
//!
//! 1. Built-in defaults
//! 2. A TOML file (`tempo.toml` by default)
//! 3. Environment variables with the `TEMPO_` prefix and `__` separator
//!    (`TEMPO_RATELIMIT__BURST=3` → `ratelimit.burst`)
//!
//! None of this is on the dispatch hot path; the router and middleware are
//! built from the resulting values during setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use tempo_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new().file("./tempo.toml").load()?;
//! let prefix = config.command.primary_prefix();
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigResult;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TempoConfig {
    /// Command prefix and matching policy.
    #[serde(default)]
    pub command: CommandConfig,

    /// Rate-limit defaults applied to commands without an explicit policy.
    #[serde(default)]
    pub ratelimit: RateLimitConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Command prefix settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Prefixes tried in order against each inbound message.
    #[serde(default = "default_prefixes")]
    pub prefixes: Vec<String>,

    /// Whether prefix matching ignores ASCII case.
    #[serde(default)]
    pub case_insensitive: bool,
}

impl CommandConfig {
    /// First configured prefix, or `"!"` when the list was set empty.
    pub fn primary_prefix(&self) -> String {
        self.prefixes
            .first()
            .cloned()
            .unwrap_or_else(|| "!".to_string())
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            prefixes: default_prefixes(),
            case_insensitive: false,
        }
    }
}

fn default_prefixes() -> Vec<String> {
    vec!["!".to_string()]
}

/// Rate-limit defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Default burst size for rate-limited commands.
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Default seconds to regenerate one token.
    #[serde(default = "default_restoration_secs")]
    pub restoration_secs: u64,

    /// Seconds of inactivity after which a bucket may be reclaimed.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: default_burst(),
            restoration_secs: default_restoration_secs(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Restoration interval as a [`Duration`].
    pub fn restoration(&self) -> Duration {
        Duration::from_secs(self.restoration_secs)
    }

    /// Idle TTL as a [`Duration`].
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

fn default_burst() -> u32 {
    1
}

fn default_restoration_secs() -> u64 {
    5
}

fn default_idle_ttl_secs() -> u64 {
    30 * 60
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level directive (trace, debug, info, warn, error), also
    /// accepting full `EnvFilter` syntax.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to include the event target in output.
    #[serde(default = "default_true")]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TEMPO_";

/// Layered configuration loader.
pub struct ConfigLoader {
    file: Option<PathBuf>,
    with_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader reading `tempo.toml` (when present) and the
    /// environment.
    pub fn new() -> Self {
        Self {
            file: Some(PathBuf::from("tempo.toml")),
            with_env: true,
        }
    }

    /// Reads from a specific TOML file instead of `tempo.toml`.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables the file source entirely.
    pub fn no_file(mut self) -> Self {
        self.file = None;
        self
    }

    /// Disables environment variable overrides.
    pub fn no_env(mut self) -> Self {
        self.with_env = false;
        self
    }

    /// Assembles the configuration from all enabled sources.
    pub fn load(self) -> ConfigResult<TempoConfig> {
        let mut figment = Figment::from(Serialized::defaults(TempoConfig::default()));

        if let Some(path) = &self.file {
            figment = figment.merge(Toml::file(path));
            debug!(path = %path.display(), "merged config file source");
        }
        if self.with_env {
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        let config: TempoConfig = figment.extract()?;
        Ok(config)
    }
}
