//! In-memory stand-ins for the external collaborators.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::{
    Error,
    ai::{AiInvoker, GenerateRequest, GenerateResponse},
    db::initialize,
    fetch::ImageFetcher,
    record::{
        ExpenseRecord, RecordStore, SQLiteRecordStore, StoredRecord, count_records,
        get_all_records,
    },
};

/// An image fetcher that records the URLs it is asked for.
pub(crate) struct FakeFetcher {
    reply: Result<Vec<u8>, String>,
    urls: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn returning(bytes: &[u8]) -> Self {
        Self {
            reply: Ok(bytes.to_vec()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_owned()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        self.urls.lock().unwrap().push(url.to_owned());

        self.reply.clone().map_err(Error::UpstreamFetchFailed)
    }
}

/// A model that gives the same reply to every request and records the requests.
pub(crate) struct FakeAi {
    reply: Result<GenerateResponse, String>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeAi {
    pub(crate) fn replying(text: &str) -> Self {
        Self::with_response(GenerateResponse::from_text(text))
    }

    pub(crate) fn with_response(response: GenerateResponse) -> Self {
        Self {
            reply: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_owned()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiInvoker for FakeAi {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Error> {
        self.requests.lock().unwrap().push(request);

        self.reply.clone().map_err(Error::AIInvocationFailed)
    }
}

/// A record store where every operation fails.
pub(crate) struct FailingRecordStore;

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn add(&self, _record: ExpenseRecord) -> Result<StoredRecord, Error> {
        Err(Error::DatabaseLockError)
    }

    async fn get_all(&self) -> Result<Vec<StoredRecord>, Error> {
        Err(Error::DatabaseLockError)
    }
}

/// A SQLite record store in memory, with direct access to its rows.
#[derive(Clone)]
pub(crate) struct TestRecordStore {
    pub(crate) store: SQLiteRecordStore,
    pub(crate) connection: Arc<Mutex<Connection>>,
}

impl TestRecordStore {
    pub(crate) fn new() -> Self {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize test database");
        let connection = Arc::new(Mutex::new(connection));

        Self {
            store: SQLiteRecordStore::new(connection.clone()),
            connection,
        }
    }

    pub(crate) fn count(&self) -> i64 {
        count_records(&self.connection.lock().unwrap()).expect("Could not count records")
    }

    pub(crate) fn all(&self) -> Vec<StoredRecord> {
        get_all_records(&self.connection.lock().unwrap()).expect("Could not get records")
    }
}
