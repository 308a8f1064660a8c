//! Storage layer: the row-store interface, its backends and configuration.

pub mod config;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

pub use config::{AppConfig, StorageBackend, StorageSettings};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{from_record, to_record, Filter, Order, Record, Store, StoreError, Table};

/// Open the backend selected by configuration.
pub fn open_store(settings: &StorageSettings) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match settings.backend {
        StorageBackend::Memory => match &settings.path {
            Some(path) => Arc::new(MemoryStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        },
        StorageBackend::Sqlite => match &settings.path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(SqliteStore::open_in_memory()?),
        },
    };

    tracing::info!("Using {} storage backend", settings.backend);
    Ok(store)
}
