//! Defines the record store trait and its SQLite implementation.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::{
    Error,
    record::{ExpenseRecord, StoredRecord, get_all_records, insert_record},
};

/// An append-only collection of expense records.
///
/// Records are never updated or deleted. Each call is atomic at whatever
/// granularity the backing store provides, no locking is added on top.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append a new record to the store.
    async fn add(&self, record: ExpenseRecord) -> Result<StoredRecord, Error>;

    /// Get every record currently in the store, in insertion order.
    async fn get_all(&self) -> Result<Vec<StoredRecord>, Error>;
}

/// Stores expense records in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteRecordStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteRecordStore {
    /// Create a new record store with a SQLite database.
    ///
    /// The caller should make sure the database has been initialized with
    /// [initialize_db](crate::initialize_db).
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

#[async_trait]
impl RecordStore for SQLiteRecordStore {
    /// Insert a record into the database.
    ///
    /// # Errors
    /// This function will return an error if the database lock is poisoned or
    /// there is an SQL error.
    async fn add(&self, record: ExpenseRecord) -> Result<StoredRecord, Error> {
        insert_record(record, &*self.lock()?)
    }

    /// Retrieve all records in the database.
    ///
    /// # Errors
    /// This function will return an error if the database lock is poisoned or
    /// there is an SQL error.
    async fn get_all(&self) -> Result<Vec<StoredRecord>, Error> {
        get_all_records(&*self.lock()?)
    }
}
