//! Implements a struct that holds the state of the REST server.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::{
    Error,
    ai::AiInvoker,
    db::initialize,
    fetch::ImageFetcher,
    object_store::{LocalObjectStore, ObjectStore},
    record::{RecordStore, SQLiteRecordStore, count_records},
};

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// Where expense records are appended and read back.
    pub record_store: Arc<dyn RecordStore>,

    /// The generative model used for extraction and insights.
    pub ai: Arc<dyn AiInvoker>,

    /// Downloads receipt images from the URLs clients send.
    pub image_fetcher: Arc<dyn ImageFetcher>,

    /// Where uploaded receipt images are stored.
    pub object_store: Arc<dyn ObjectStore>,

    /// The directory served at [OBJECTS](crate::endpoints::OBJECTS).
    pub objects_dir: PathBuf,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the expense
    /// record table if it does not exist yet.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        ai: Arc<dyn AiInvoker>,
        image_fetcher: Arc<dyn ImageFetcher>,
        object_store: LocalObjectStore,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let record_count = count_records(&db_connection)?;
        tracing::info!("Database has {record_count} expense records");

        let connection = Arc::new(Mutex::new(db_connection));
        let objects_dir = object_store.root().to_path_buf();

        Ok(Self {
            record_store: Arc::new(SQLiteRecordStore::new(connection)),
            ai,
            image_fetcher,
            object_store: Arc::new(object_store),
            objects_dir,
        })
    }
}
