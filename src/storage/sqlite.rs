//! SQLite-backed [`Store`] using rusqlite.
//!
//! Records map onto the explicit columns declared in [`super::schema`]; nested
//! values (lesson lists, criteria, messages) are stored as JSON text.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::schema::{column_kind, columns, ColumnKind, CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use super::store::{Comparison, Filter, Order, Record, Store, StoreError, Table};

/// SQLite store. The connection is guarded so the store can be shared.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        Ok(store)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        Ok(store)
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.connection();

        conn.execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        if current_version < CURRENT_VERSION {
            migrate(&conn, current_version)?;
        }

        Ok(())
    }
}

/// Run database migrations.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
    if from_version < 1 {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
            [CURRENT_VERSION],
        )
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        tracing::info!("Database migrated to version {}", CURRENT_VERSION);
    }

    Ok(())
}

fn map_sql_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::ConstraintViolation(e.to_string())
        }
        _ => StoreError::QueryFailed(e.to_string()),
    }
}

fn require_kind(table: Table, column: &str) -> Result<ColumnKind, StoreError> {
    column_kind(table, column).ok_or_else(|| StoreError::InvalidColumn {
        table,
        column: column.to_string(),
    })
}

/// Convert a JSON value into the SQL value stored for a column kind.
fn to_sql(kind: ColumnKind, value: &Value) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        return Ok(SqlValue::Null);
    }

    let converted = match kind {
        ColumnKind::Text => match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        },
        ColumnKind::Integer => match value.as_i64() {
            Some(n) => SqlValue::Integer(n),
            None => match value.as_f64() {
                Some(f) => SqlValue::Integer(f.round() as i64),
                None => {
                    return Err(StoreError::SerializationError(format!(
                        "expected an integer, got {}",
                        value
                    )))
                }
            },
        },
        ColumnKind::Real => match value.as_f64() {
            Some(f) => SqlValue::Real(f),
            None => {
                return Err(StoreError::SerializationError(format!(
                    "expected a number, got {}",
                    value
                )))
            }
        },
        ColumnKind::Json => SqlValue::Text(
            serde_json::to_string(value)
                .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        ),
    };

    Ok(converted)
}

/// Convert a stored SQL value back into JSON.
fn from_sql(kind: ColumnKind, value: SqlValue) -> Result<Value, StoreError> {
    let converted = match (kind, value) {
        (_, SqlValue::Null) => Value::Null,
        (ColumnKind::Json, SqlValue::Text(s)) => serde_json::from_str(&s)
            .map_err(|e| StoreError::DeserializationError(e.to_string()))?,
        (_, SqlValue::Text(s)) => Value::String(s),
        (_, SqlValue::Integer(n)) => Value::Number(n.into()),
        (_, SqlValue::Real(f)) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        (_, SqlValue::Blob(_)) => {
            return Err(StoreError::DeserializationError(
                "unexpected blob column".to_string(),
            ))
        }
    };

    Ok(converted)
}

/// Build a `WHERE` clause and its parameters.
fn where_clause(table: Table, filter: &Filter) -> Result<(String, Vec<SqlValue>), StoreError> {
    if filter.conditions.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut parts = Vec::with_capacity(filter.conditions.len());
    let mut params = Vec::with_capacity(filter.conditions.len());
    for condition in &filter.conditions {
        let kind = require_kind(table, &condition.column)?;
        if condition.value.is_null() && condition.op == Comparison::Eq {
            parts.push(format!("\"{}\" IS NULL", condition.column));
            continue;
        }
        parts.push(format!("\"{}\" {} ?", condition.column, condition.op.as_sql()));
        params.push(to_sql(kind, &condition.value)?);
    }

    Ok((format!(" WHERE {}", parts.join(" AND ")), params))
}

fn select_list(table: Table) -> String {
    columns(table)
        .iter()
        .map(|(name, _)| format!("\"{}\"", name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_record(table: Table, row: &Row<'_>) -> rusqlite::Result<Result<Record, StoreError>> {
    let mut record = Record::new();
    for (index, (name, kind)) in columns(table).iter().enumerate() {
        let value: SqlValue = row.get(index)?;
        match from_sql(*kind, value) {
            Ok(value) => {
                record.insert(name.to_string(), value);
            }
            Err(e) => return Ok(Err(e)),
        }
    }
    Ok(Ok(record))
}

fn select_rows(
    conn: &Connection,
    table: Table,
    filter: &Filter,
    order: &[Order],
    limit: Option<usize>,
) -> Result<Vec<Record>, StoreError> {
    let (clause, params) = where_clause(table, filter)?;

    let mut order_parts = Vec::with_capacity(order.len() + 1);
    for key in order {
        require_kind(table, &key.column)?;
        order_parts.push(format!(
            "\"{}\" {}",
            key.column,
            if key.descending { "DESC" } else { "ASC" }
        ));
    }
    // Insertion order breaks remaining ties.
    order_parts.push("rowid ASC".to_string());

    let mut sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        select_list(table),
        table,
        clause,
        order_parts.join(", ")
    );
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| read_record(table, row))
        .map_err(map_sql_error)?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(map_sql_error)??);
    }

    Ok(records)
}

fn find_rowid(conn: &Connection, table: Table, filter: &Filter) -> Result<Option<i64>, StoreError> {
    let (clause, params) = where_clause(table, filter)?;
    let sql = format!("SELECT rowid FROM {}{} ORDER BY rowid ASC LIMIT 1", table, clause);

    conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
        .optional()
        .map_err(map_sql_error)
}

fn select_by_rowid(conn: &Connection, table: Table, rowid: i64) -> Result<Record, StoreError> {
    let sql = format!("SELECT {} FROM {} WHERE rowid = ?1", select_list(table), table);

    conn.query_row(&sql, [rowid], |row| read_record(table, row))
        .optional()
        .map_err(map_sql_error)?
        .ok_or(StoreError::NotFound(table))?
}

impl Store for SqliteStore {
    fn get_row(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let conn = self.connection();
        Ok(select_rows(&conn, table, filter, &[], Some(1))?.into_iter().next())
    }

    fn insert_row(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        let pk = table.primary_key();
        if record.get(pk).map_or(true, Value::is_null) {
            record.insert(pk.to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut names = Vec::with_capacity(record.len());
        let mut params = Vec::with_capacity(record.len());
        for (column, value) in &record {
            let kind = require_kind(table, column)?;
            names.push(format!("\"{}\"", column));
            params.push(to_sql(kind, value)?);
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            placeholders
        );

        let conn = self.connection();
        conn.execute(&sql, params_from_iter(params.iter()))
            .map_err(map_sql_error)?;
        let rowid = conn.last_insert_rowid();

        tracing::debug!("Inserted row into {}", table);
        select_by_rowid(&conn, table, rowid)
    }

    fn update_row(
        &self,
        table: Table,
        filter: &Filter,
        partial: Record,
    ) -> Result<Record, StoreError> {
        let conn = self.connection();
        let rowid = find_rowid(&conn, table, filter)?.ok_or(StoreError::NotFound(table))?;

        if !partial.is_empty() {
            let mut assignments = Vec::with_capacity(partial.len());
            let mut params = Vec::with_capacity(partial.len() + 1);
            for (column, value) in &partial {
                let kind = require_kind(table, column)?;
                assignments.push(format!("\"{}\" = ?", column));
                params.push(to_sql(kind, value)?);
            }
            params.push(SqlValue::Integer(rowid));

            let sql = format!(
                "UPDATE {} SET {} WHERE rowid = ?",
                table,
                assignments.join(", ")
            );
            conn.execute(&sql, params_from_iter(params.iter()))
                .map_err(map_sql_error)?;
        }

        select_by_rowid(&conn, table, rowid)
    }

    fn query(
        &self,
        table: Table,
        filter: &Filter,
        order: &[Order],
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        let conn = self.connection();
        select_rows(&conn, table, filter, order, limit)
    }

    fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, params) = where_clause(table, filter)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", table, clause);

        let conn = self.connection();
        let count: i64 = conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))
            .map_err(map_sql_error)?;

        Ok(count.max(0) as u64)
    }

    fn delete_rows(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, params) = where_clause(table, filter)?;
        let sql = format!("DELETE FROM {}{}", table, clause);

        let conn = self.connection();
        let removed = conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(map_sql_error)?;

        Ok(removed as u64)
    }
}
