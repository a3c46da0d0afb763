//! Database operations for expense records.

use rusqlite::{Connection, Row, types::Type};
use time::OffsetDateTime;

use crate::{
    Error,
    record::{ExpenseRecord, StoredRecord},
};

/// Append a record and return it with its generated ID.
///
/// The record is stored as a JSON document, exactly as it was given.
pub fn insert_record(record: ExpenseRecord, connection: &Connection) -> Result<StoredRecord, Error> {
    let document = serde_json::to_string(&record)
        .map_err(|error| Error::JSONSerializationError(error.to_string()))?;
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expense_record (document, created_at) VALUES (?1, ?2);",
        (document, created_at),
    )?;

    let id = connection.last_insert_rowid();

    Ok(StoredRecord {
        id,
        created_at,
        record,
    })
}

/// Retrieve every record in insertion order.
pub fn get_all_records(connection: &Connection) -> Result<Vec<StoredRecord>, Error> {
    connection
        .prepare("SELECT id, document, created_at FROM expense_record ORDER BY id ASC;")?
        .query_map([], map_row)?
        .map(|maybe_record| maybe_record.map_err(|error| error.into()))
        .collect()
}

/// Count the records in the store.
pub fn count_records(connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM expense_record;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Initialize the expense record table.
pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense_record (
            id INTEGER PRIMARY KEY,
            document TEXT NOT NULL,
            created_at TEXT NOT NULL
        );",
        (),
    )?;

    Ok(())
}

fn map_row(row: &Row) -> Result<StoredRecord, rusqlite::Error> {
    let id = row.get(0)?;
    let document: String = row.get(1)?;
    let created_at = row.get(2)?;

    let record = serde_json::from_str(&document).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
    })?;

    Ok(StoredRecord {
        id,
        created_at,
        record,
    })
}
