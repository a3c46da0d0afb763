//! Expense records extracted from receipts and the store that keeps them.

mod db;
mod domain;
mod store;

pub use db::{count_records, create_record_table, get_all_records, insert_record};
pub use domain::{Category, ExpenseRecord, RecordId, StoredRecord};
pub use store::{RecordStore, SQLiteRecordStore};
