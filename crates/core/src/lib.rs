//! # strata-core
//!
//! Configuration loading, the connection descriptor and logging setup shared
//! by the strata migration engine and CLI.

pub mod config;
pub mod logging;

pub use config::{
    load_config, ConfigError, ConnectionDescriptor, DriverKind, PoolSettings, SslMode, Transport,
    DEFAULT_CONFIG_PATH, PASSWORD_ENV_VAR,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
