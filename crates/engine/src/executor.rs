//! Transactional SQL Executor
//!
//! Runs a list of statements inside one explicit transaction: commit when all
//! succeed, rollback on the first failure. The failing statement's error is
//! what the caller sees even when the rollback fails too.

use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use tracing::{debug, warn};

use crate::backends::{DatabaseTransaction, DatabaseValue, SqlDialect};
use crate::connection::Connection;
use crate::error::{DatabaseResult, MigrationError, MigrationResult};

/// One unit of work inside a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Raw SQL text, possibly several `;`-separated statements
    Script(String),
    /// A single statement with bound parameters
    Prepared { sql: String, params: Vec<DatabaseValue> },
}

impl Statement {
    pub fn prepared(sql: impl Into<String>, params: Vec<DatabaseValue>) -> Self {
        Statement::Prepared {
            sql: sql.into(),
            params,
        }
    }
}

/// Execute `sql` with `params` in its own transaction
pub async fn execute_transactional(
    conn: &Connection,
    label: &str,
    sql: &str,
    params: &[DatabaseValue],
) -> MigrationResult<()> {
    let statement = if params.is_empty() {
        Statement::Script(sql.to_string())
    } else {
        Statement::prepared(sql, params.to_vec())
    };
    execute_statements(conn, label, &[statement]).await
}

/// Execute every statement in order inside a single transaction
pub async fn execute_statements(conn: &Connection, label: &str, statements: &[Statement]) -> MigrationResult<()> {
    let mut tx = conn
        .pool()
        .begin_transaction()
        .await
        .map_err(|e| MigrationError::Connection(e.to_string()))?;
    debug!("Transaction started for {}", label);

    for statement in statements {
        let result = run_statement(tx.as_mut(), statement).await;
        if let Err(err) = result {
            warn!("Error executing {}: {}", label, err);
            warn!("Rolling back {}", label);

            if let Err(rollback_err) = tx.rollback().await {
                warn!("Unable to rollback {}: {}", label, rollback_err);
            }

            return Err(MigrationError::Execution {
                name: label.to_string(),
                message: err.to_string(),
            });
        }
    }

    tx.commit().await.map_err(|e| MigrationError::Commit {
        name: label.to_string(),
        message: e.to_string(),
    })?;
    debug!("Transaction committed for {}", label);

    Ok(())
}

/// Execute one statement inside an open transaction
pub async fn run_statement(tx: &mut dyn DatabaseTransaction, statement: &Statement) -> DatabaseResult<()> {
    match statement {
        Statement::Script(sql) => tx.execute_script(sql).await,
        Statement::Prepared { sql, params } => tx.execute(sql, params).await.map(|_| ()),
    }
}

/// Turn a migration file's text into statements for one transaction
///
/// Without `split` the file runs as one multi-statement script. With `split`
/// each statement runs on its own, still inside the same transaction.
pub fn script_statements(sql: &str, dialect: SqlDialect, split: bool) -> Vec<Statement> {
    if !split {
        return vec![Statement::Script(sql.to_string())];
    }

    split_sql_statements(sql, dialect)
        .into_iter()
        .map(Statement::Script)
        .collect()
}

/// Split SQL text into statements using the backend's SQL grammar
pub fn split_sql_statements(sql: &str, dialect: SqlDialect) -> Vec<String> {
    let parser_dialect: Box<dyn Dialect> = match dialect {
        SqlDialect::PostgreSQL => Box::new(PostgreSqlDialect {}),
        SqlDialect::MySQL => Box::new(MySqlDialect {}),
    };

    match Parser::parse_sql(parser_dialect.as_ref(), sql) {
        Ok(parsed) => parsed.into_iter().map(|stmt| format!("{};", stmt)).collect(),
        Err(e) => {
            warn!("SQL parsing failed, using naive semicolon splitting: {}", e);
            sql.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty() && !is_comment_only(s))
                .map(|s| format!("{};", s))
                .collect()
        }
    }
}

fn is_comment_only(fragment: &str) -> bool {
    fragment
        .lines()
        .all(|line| line.trim().is_empty() || line.trim_start().starts_with("--"))
}
