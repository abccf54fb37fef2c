//! In-memory transactional database used by the engine's tests
//!
//! Understands just enough SQL to exercise the engine: `CREATE TABLE`,
//! `DROP TABLE`, `INSERT INTO <table>` and the ledger's own queries. Anything
//! else is a syntax error. Transactions work on a snapshot that replaces the
//! shared state on commit.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::backends::*;
use crate::connection::Connection;
use crate::error::{DatabaseError, DatabaseResult};

#[derive(Debug, Clone, Default)]
struct FakeState {
    tables: BTreeSet<String>,
    rows: BTreeMap<String, usize>,
    ledger: Vec<(i64, String)>,
    next_id: i64,
}

impl FakeState {
    fn run(&mut self, ledger_table: &str, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<()> {
        let statement = strip_comments(sql);
        if statement.is_empty() {
            return Ok(());
        }
        let upper = statement.to_uppercase();
        let words: Vec<&str> = statement.split_whitespace().collect();

        if upper.starts_with("CREATE TABLE ") {
            let name = identifier(words.get(2).copied().unwrap_or_default());
            if name.is_empty() {
                return Err(syntax_error(&statement));
            }
            if !self.tables.insert(name.clone()) {
                return Err(DatabaseError::Query(format!("relation \"{}\" already exists", name)));
            }
            return Ok(());
        }

        if upper.starts_with("DROP TABLE ") {
            let name = identifier(words.get(2).copied().unwrap_or_default());
            if !self.tables.remove(&name) {
                return Err(DatabaseError::Query(format!("table \"{}\" does not exist", name)));
            }
            self.rows.remove(&name);
            return Ok(());
        }

        if upper.starts_with("INSERT INTO ") {
            let name = identifier(words.get(2).copied().unwrap_or_default());
            if !self.tables.contains(&name) {
                return Err(DatabaseError::Query(format!("relation \"{}\" does not exist", name)));
            }
            if name == ledger_table {
                let migration = params
                    .first()
                    .and_then(DatabaseValue::as_str)
                    .ok_or_else(|| DatabaseError::Query("ledger insert without a name".to_string()))?;
                if self.ledger.iter().any(|(_, n)| n == migration) {
                    return Err(DatabaseError::Query(format!("duplicate key value: {}", migration)));
                }
                self.next_id += 1;
                self.ledger.push((self.next_id, migration.to_string()));
            } else {
                *self.rows.entry(name).or_default() += 1;
            }
            return Ok(());
        }

        Err(syntax_error(&statement))
    }

    fn require_table(&self, table: &str) -> DatabaseResult<()> {
        if self.tables.contains(table) {
            Ok(())
        } else {
            Err(DatabaseError::Query(format!("relation \"{}\" does not exist", table)))
        }
    }
}

fn strip_comments(sql: &str) -> String {
    sql.lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn identifier(token: &str) -> String {
    token
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_matches(|c| c == '`' || c == '"')
        .to_lowercase()
}

fn syntax_error(statement: &str) -> DatabaseError {
    DatabaseError::Query(format!("syntax error at or near \"{}\"", statement))
}

#[derive(Default)]
struct FakeInner {
    state: Mutex<FakeState>,
    log: Mutex<Vec<String>>,
    fail_begin: AtomicBool,
    fail_commit: AtomicBool,
    fail_rollback: AtomicBool,
    fail_queries: AtomicBool,
}

/// Handle to one in-memory database, shared by every connection made from it
#[derive(Clone, Default)]
pub struct FakeDatabase {
    inner: Arc<FakeInner>,
}

pub const LEDGER: &str = "migrations";

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self, dialect: SqlDialect) -> Connection {
        Connection::new(Arc::new(FakePool { db: self.clone() }), dialect)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.inner.state.lock().unwrap().tables.contains(name)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.inner.state.lock().unwrap().rows.get(table).copied().unwrap_or(0)
    }

    pub fn ledger_names(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .unwrap()
            .ledger
            .iter()
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Every statement or script sent to the database, committed or not
    pub fn log(&self) -> Vec<String> {
        self.inner.log.lock().unwrap().clone()
    }

    pub fn attempted(&self, needle: &str) -> bool {
        self.log().iter().any(|sql| sql.contains(needle))
    }

    pub fn fail_begin(&self, fail: bool) {
        self.inner.fail_begin.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commit(&self, fail: bool) {
        self.inner.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_rollback(&self, fail: bool) {
        self.inner.fail_rollback.store(fail, Ordering::SeqCst);
    }

    pub fn fail_queries(&self, fail: bool) {
        self.inner.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn record(&self, sql: &str) {
        self.inner.log.lock().unwrap().push(sql.to_string());
    }

    fn snapshot(&self) -> FakeState {
        self.inner.state.lock().unwrap().clone()
    }
}

struct FakePool {
    db: FakeDatabase,
}

struct FakeRow(Vec<DatabaseValue>);

impl DatabaseRow for FakeRow {
    fn get_by_index(&self, index: usize) -> DatabaseResult<DatabaseValue> {
        self.0
            .get(index)
            .cloned()
            .ok_or_else(|| DatabaseError::Decode(format!("Column index {} out of range", index)))
    }

    fn column_count(&self) -> usize {
        self.0.len()
    }
}

impl FakePool {
    fn query(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        self.db.record(sql);
        if self.db.inner.fail_queries.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("server closed the connection unexpectedly".to_string()));
        }

        let state = self.db.snapshot();
        let upper = sql.to_uppercase();
        if !upper.trim_start().starts_with("SELECT") || !upper.contains(&format!("FROM {}", LEDGER.to_uppercase())) {
            return Err(syntax_error(sql));
        }
        state.require_table(LEDGER)?;

        let created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = if upper.contains("WHERE NAME") {
            let name = params.first().and_then(DatabaseValue::as_str).unwrap_or_default();
            state
                .ledger
                .iter()
                .filter(|(_, n)| n == name)
                .map(|_| Box::new(FakeRow(vec![DatabaseValue::Int64(1)])) as Box<dyn DatabaseRow>)
                .collect()
        } else {
            state
                .ledger
                .iter()
                .map(|(id, name)| {
                    Box::new(FakeRow(vec![
                        DatabaseValue::Int64(*id),
                        DatabaseValue::String(name.clone()),
                        DatabaseValue::DateTime(created_at),
                    ])) as Box<dyn DatabaseRow>
                })
                .collect()
        };
        Ok(rows)
    }
}

#[async_trait]
impl DatabasePool for FakePool {
    async fn begin_transaction(&self) -> DatabaseResult<Box<dyn DatabaseTransaction>> {
        if self.db.inner.fail_begin.load(Ordering::SeqCst) {
            return Err(DatabaseError::Connection("connection refused".to_string()));
        }
        Ok(Box::new(FakeTransaction {
            db: self.db.clone(),
            state: self.db.snapshot(),
        }))
    }

    async fn fetch_optional(
        &self,
        sql: &str,
        params: &[DatabaseValue],
    ) -> DatabaseResult<Option<Box<dyn DatabaseRow>>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    async fn fetch_all(&self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<Vec<Box<dyn DatabaseRow>>> {
        self.query(sql, params)
    }

    async fn close(&self) {}

    fn stats(&self) -> DatabasePoolStats {
        DatabasePoolStats::default()
    }
}

struct FakeTransaction {
    db: FakeDatabase,
    state: FakeState,
}

#[async_trait]
impl DatabaseTransaction for FakeTransaction {
    async fn execute(&mut self, sql: &str, params: &[DatabaseValue]) -> DatabaseResult<u64> {
        self.db.record(sql);
        self.state.run(LEDGER, sql, params)?;
        Ok(1)
    }

    async fn execute_script(&mut self, sql: &str) -> DatabaseResult<()> {
        self.db.record(sql);
        for statement in sql.split(';') {
            self.state.run(LEDGER, statement, &[])?;
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        if self.db.inner.fail_commit.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transaction("could not commit: connection lost".to_string()));
        }
        let FakeTransaction { db, state } = *self;
        *db.inner.state.lock().unwrap() = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DatabaseResult<()> {
        if self.db.inner.fail_rollback.load(Ordering::SeqCst) {
            return Err(DatabaseError::Transaction("rollback failed: connection lost".to_string()));
        }
        Ok(())
    }
}
