//! Database Backend Abstractions
//!
//! One capability set ([`DatabaseBackend`], [`DatabasePool`],
//! [`DatabaseTransaction`]) with a concrete implementation per supported
//! driver, selected from the descriptor's driver field.

pub mod core;
pub mod mysql;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use sqlx::pool::PoolOptions;
use strata_core::{DriverKind, PoolSettings};

pub use self::core::*;
pub use self::mysql::MySqlBackend;
pub use self::postgres::PostgresBackend;

/// Pick the backend implementation for a driver
pub fn backend_for(driver: DriverKind) -> Arc<dyn DatabaseBackend> {
    match driver {
        DriverKind::MySql => Arc::new(MySqlBackend::new()),
        DriverKind::Postgres => Arc::new(PostgresBackend::new()),
    }
}

/// sqlx pool options from the configured limits
pub(crate) fn pool_options<DB: sqlx::Database>(settings: &PoolSettings) -> PoolOptions<DB> {
    let mut options = PoolOptions::<DB>::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .test_before_acquire(true);

    if let Some(idle_timeout) = settings.idle_timeout_seconds {
        options = options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    if let Some(max_lifetime) = settings.max_lifetime_seconds {
        options = options.max_lifetime(Duration::from_secs(max_lifetime));
    }

    options
}
