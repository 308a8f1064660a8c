//! Row-store abstraction shared by every backend.
//!
//! The engine only ever needs five operation shapes (get, insert, update,
//! query, count) plus deletion of chat sessions. Records are JSON objects so
//! that typed models round-trip through serde regardless of the backend.

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A single row, keyed by column name.
pub type Record = Map<String, Value>;

/// Tables the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    UserStats,
    UserProgress,
    Courses,
    Achievements,
    UserAchievements,
    ChatSessions,
}

impl Table {
    /// Every table, in creation order.
    pub const ALL: [Table; 6] = [
        Table::UserStats,
        Table::UserProgress,
        Table::Courses,
        Table::Achievements,
        Table::UserAchievements,
        Table::ChatSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::UserStats => "user_stats",
            Table::UserProgress => "user_progress",
            Table::Courses => "courses",
            Table::Achievements => "achievements",
            Table::UserAchievements => "user_achievements",
            Table::ChatSessions => "chat_sessions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Table::ALL.iter().copied().find(|t| t.as_str() == s)
    }

    /// Column holding the primary key.
    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::UserStats => "user_id",
            _ => "id",
        }
    }

    /// Column groups that must be unique besides the primary key.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Table::UserProgress => &[&["user_id", "course_id"]],
            Table::UserAchievements => &[&["user_id", "achievement_id"]],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
}

impl Comparison {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
        }
    }
}

/// One `column <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub op: Comparison,
    pub value: Value,
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    /// Filter matching every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality condition.
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.to_string(),
            op: Comparison::Eq,
            value: value.into(),
        });
        self
    }

    /// Add a strictly-greater-than condition.
    pub fn gt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.to_string(),
            op: Comparison::Gt,
            value: value.into(),
        });
        self
    }

    /// Check a record against every condition.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| {
            let actual = record.get(&c.column).unwrap_or(&Value::Null);
            match c.op {
                Comparison::Eq => compare_values(actual, &c.value) == Ordering::Equal,
                Comparison::Gt => {
                    !actual.is_null() && compare_values(actual, &c.value) == Ordering::Greater
                }
            }
        })
    }
}

/// Sort key for queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }
}

/// Order two JSON values the way a relational store would.
///
/// Nulls sort first, numbers compare numerically, strings lexically.
/// Values of different kinds compare by kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return x.cmp(&y);
            }
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        (x, y) if rank(x) == rank(y) => x.to_string().cmp(&y.to_string()),
        (x, y) => rank(x).cmp(&rank(y)),
    }
}

/// Compare two records by a list of sort keys.
pub fn compare_records(a: &Record, b: &Record, order: &[Order]) -> Ordering {
    for key in order {
        let left = a.get(&key.column).unwrap_or(&Value::Null);
        let right = b.get(&key.column).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right);
        let ordering = if key.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Backing store for all engine state.
///
/// Implementations must be safe to share between threads; each call is
/// atomic on its own but calls are not grouped into transactions.
pub trait Store: Send + Sync {
    /// First row matching the filter, if any.
    fn get_row(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError>;

    /// Insert a row and return it as stored.
    fn insert_row(&self, table: Table, record: Record) -> Result<Record, StoreError>;

    /// Merge `partial` into the first row matching the filter and return the result.
    fn update_row(&self, table: Table, filter: &Filter, partial: Record)
        -> Result<Record, StoreError>;

    /// Rows matching the filter, sorted by `order`, truncated to `limit`.
    fn query(
        &self,
        table: Table,
        filter: &Filter,
        order: &[Order],
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError>;

    /// Number of rows matching the filter.
    fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError>;

    /// Delete rows matching the filter and return how many were removed.
    fn delete_rows(&self, table: Table, filter: &Filter) -> Result<u64, StoreError>;
}

/// Serialize a model into a record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::SerializationError(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(StoreError::SerializationError(e.to_string())),
    }
}

/// Deserialize a record into a model.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| StoreError::DeserializationError(e.to_string()))
}

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found in {0}")]
    NotFound(Table),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Unknown column {column} in {table}")]
    InvalidColumn { table: Table, column: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}
