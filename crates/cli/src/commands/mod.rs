pub mod init;
pub mod migrate;
pub mod new;
pub mod status;

use std::path::Path;

use anyhow::Context;
use strata_core::load_config;
use strata_engine::{Connection, ConnectionBuilder, MigrationRunner, RunnerOptions};

/// An open connection and the runner bound to it
pub struct Session {
    conn: Connection,
    pub runner: MigrationRunner,
}

impl Session {
    /// Load `config`, connect, and build a runner honouring its options
    pub async fn open(config: &Path) -> anyhow::Result<Self> {
        tracing::debug!("Using configuration {}", config.display());
        let descriptor = load_config(config)
            .with_context(|| format!("Failed to load configuration from {}", config.display()))?;
        let options = RunnerOptions {
            split_statements: descriptor.split_statements,
        };

        let conn = ConnectionBuilder::connect(descriptor)
            .await
            .context("Failed to connect to the database")?;
        let runner = MigrationRunner::with_options(conn.clone(), options);

        Ok(Self { conn, runner })
    }

    /// Release the connection pool
    pub async fn close(self) {
        self.conn.close().await;
    }
}
