//! In-process store with optional JSON snapshot persistence.
//!
//! Used for anonymous/offline use and for tests. When opened with a path,
//! every mutation rewrites the snapshot file so state survives restarts. A
//! mutation whose snapshot cannot be written is rolled back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde_json::Value;
use uuid::Uuid;

use super::store::{compare_records, Filter, Order, Record, Store, StoreError, Table};

/// Rows per table, keyed by table name so snapshots stay plain JSON.
type Tables = BTreeMap<String, Vec<Record>>;

/// Memory-backed [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a snapshot file, loading it if it exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let tables = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| StoreError::IoError(e.to_string()))?;
            serde_json::from_str::<Tables>(&content)
                .map_err(|e| StoreError::DeserializationError(e.to_string()))?
        } else {
            Tables::new()
        };

        tracing::debug!(
            "Opened memory store at {} ({} tables)",
            path.display(),
            tables.len()
        );

        Ok(Self {
            tables: RwLock::new(tables),
            snapshot_path: Some(path.to_path_buf()),
        })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(tables)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        // Write beside the snapshot, then rename over it.
        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);
        std::fs::write(&staging, content).map_err(|e| StoreError::IoError(e.to_string()))?;
        std::fs::rename(&staging, path).map_err(|e| StoreError::IoError(e.to_string()))
    }

    /// Replace one table's rows and persist. On failure the previous rows are
    /// put back so memory never runs ahead of the snapshot.
    fn commit(
        &self,
        tables: &mut Tables,
        table: Table,
        rows: Vec<Record>,
    ) -> Result<(), StoreError> {
        let name = table.as_str().to_string();
        let previous = tables.insert(name.clone(), rows);

        if let Err(e) = self.persist(tables) {
            match previous {
                Some(rows) => tables.insert(name, rows),
                None => tables.remove(&name),
            };
            tracing::warn!("Snapshot write failed, {} left unchanged: {}", table, e);
            return Err(e);
        }

        Ok(())
    }
}

/// Fail if `candidate` collides with an existing row on a unique column set.
fn check_unique(
    table: Table,
    rows: &[Record],
    candidate: &Record,
    skip: Option<usize>,
) -> Result<(), StoreError> {
    let pk = table.primary_key();
    let mut keys: Vec<&[&str]> = vec![std::slice::from_ref(&pk)];
    keys.extend(table.unique_keys().iter().copied());

    'keys: for columns in keys {
        let mut filter = Filter::all();
        for column in columns {
            match candidate.get(*column) {
                Some(value) if !value.is_null() => filter = filter.eq(column, value.clone()),
                _ => continue 'keys,
            }
        }

        let clash = rows
            .iter()
            .enumerate()
            .any(|(i, row)| Some(i) != skip && filter.matches(row));
        if clash {
            return Err(StoreError::ConstraintViolation(format!(
                "{}({}) must be unique",
                table,
                columns.join(", ")
            )));
        }
    }

    Ok(())
}

impl Store for MemoryStore {
    fn get_row(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError> {
        let tables = self.read();
        Ok(tables
            .get(table.as_str())
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)))
            .cloned())
    }

    fn insert_row(&self, table: Table, mut record: Record) -> Result<Record, StoreError> {
        let pk = table.primary_key();
        if record.get(pk).map_or(true, Value::is_null) {
            record.insert(pk.to_string(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut tables = self.write();
        let mut rows = tables.get(table.as_str()).cloned().unwrap_or_default();
        check_unique(table, &rows, &record, None)?;
        rows.push(record.clone());
        self.commit(&mut tables, table, rows)?;

        tracing::debug!("Inserted row into {}", table);
        Ok(record)
    }

    fn update_row(
        &self,
        table: Table,
        filter: &Filter,
        partial: Record,
    ) -> Result<Record, StoreError> {
        let mut tables = self.write();
        let mut rows = tables.get(table.as_str()).cloned().unwrap_or_default();
        let index = rows
            .iter()
            .position(|row| filter.matches(row))
            .ok_or(StoreError::NotFound(table))?;

        let mut updated = rows[index].clone();
        for (column, value) in partial {
            updated.insert(column, value);
        }
        check_unique(table, &rows, &updated, Some(index))?;
        rows[index] = updated.clone();
        self.commit(&mut tables, table, rows)?;

        Ok(updated)
    }

    fn query(
        &self,
        table: Table,
        filter: &Filter,
        order: &[Order],
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        let tables = self.read();
        let mut rows: Vec<Record> = tables
            .get(table.as_str())
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        // Stable sort keeps insertion order for equal keys.
        rows.sort_by(|a, b| compare_records(a, b, order));
        if let Some(limit) = limit {
            rows.truncate(limit);
        }

        Ok(rows)
    }

    fn count(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let tables = self.read();
        Ok(tables
            .get(table.as_str())
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).count() as u64)
            .unwrap_or(0))
    }

    fn delete_rows(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        let mut tables = self.write();
        let mut rows = tables.get(table.as_str()).cloned().unwrap_or_default();
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        let removed = (before - rows.len()) as u64;

        if removed > 0 {
            self.commit(&mut tables, table, rows)?;
        }

        Ok(removed)
    }
}
