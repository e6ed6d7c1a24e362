// src/core/persistence/sqlite.rs

//! A `QueryExecutor` backed by an embedded SQLite database.

use super::{QueryExecutor, Row, SqlValue};
use crate::core::ClusterJoinError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{Connection, ToSql, params_from_iter};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// The tables this crate reads and writes. `singleton` makes a second cluster row
/// impossible regardless of its id.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cluster (
    cluster_id TEXT NOT NULL PRIMARY KEY,
    singleton  INTEGER NOT NULL DEFAULT 1 UNIQUE CHECK (singleton = 1)
);
CREATE TABLE IF NOT EXISTS server (
    server_id             TEXT NOT NULL PRIMARY KEY,
    cluster_id            TEXT,
    name                  TEXT,
    ip_address            TEXT NOT NULL,
    host                  TEXT,
    cache_port            INTEGER,
    es_transport_tcp_port INTEGER,
    es_http_port          INTEGER,
    last_heartbeat        INTEGER
);
CREATE INDEX IF NOT EXISTS server_ip_address_idx ON server (ip_address);
";

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) | ValueRef::Blob(t) => {
                SqlValue::Text(String::from_utf8_lossy(t).into_owned())
            }
        }
    }
}

/// A shared SQLite connection. Statements run on Tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Opens (or creates) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: &str) -> Result<Self, ClusterJoinError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        };
        info!("Opened cluster database at '{}'", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self, ClusterJoinError> {
        Self::open(":memory:")
    }

    /// Creates the `cluster` and `server` tables if they do not exist.
    pub async fn initialize_schema(&self) -> Result<(), ClusterJoinError> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || conn.lock().execute_batch(SCHEMA)).await??;
        Ok(())
    }
}

fn run_query(conn: &Connection, sql: &str, params: &[SqlValue]) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;

    let mut results = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = Row::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            record.insert(name.clone(), SqlValue::from(row.get_ref(i)?));
        }
        results.push(record);
    }
    Ok(results)
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>, ClusterJoinError> {
        debug!("query: {} {:?}", sql, params);
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let rows =
            tokio::task::spawn_blocking(move || run_query(&conn.lock(), &sql, &params)).await??;
        Ok(rows)
    }

    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<usize, ClusterJoinError> {
        debug!("execute: {} {:?}", sql, params);
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let changed = tokio::task::spawn_blocking(move || {
            conn.lock()
                .execute(&sql, params_from_iter(params.iter()))
        })
        .await??;
        Ok(changed)
    }
}
