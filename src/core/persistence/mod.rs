// src/core/persistence/mod.rs

//! The generic persistence/query facility: parameterized statements returning rows
//! as ordered key-value records.

pub mod sqlite;

use crate::core::ClusterJoinError;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

pub use sqlite::SqliteExecutor;

/// A single column value, as bound to a parameter or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            SqlValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

impl From<u16> for SqlValue {
    fn from(i: u16) -> Self {
        SqlValue::Integer(i64::from(i))
    }
}

/// One result row, keyed by column name in select order.
pub type Row = IndexMap<String, SqlValue>;

/// Executes parameterized SQL against the backing store.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Runs a query and returns every resulting row.
    async fn query(&self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>, ClusterJoinError>;

    /// Runs a statement and returns the number of rows it changed.
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> Result<usize, ClusterJoinError>;
}
