//! # Tempo Runtime
//!
//! Process-level concerns for tempo bots: typed configuration loaded once
//! at startup ([`config`]) and tracing-subscriber setup ([`logging`]).
//! Nothing here sits on the dispatch hot path.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    CommandConfig, ConfigLoader, ENV_PREFIX, LoggingConfig, RateLimitConfig, TempoConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use logging::{LoggingBuilder, init_from_config};
