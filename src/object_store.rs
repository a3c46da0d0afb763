//! Key-addressed storage for uploaded receipt images.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{Error, endpoints};

/// The logical folder receipt images are uploaded to.
pub const RECEIPT_KEY_PREFIX: &str = "receipts";

/// Create a unique key for a new receipt image, e.g. `receipts/<uuid>.jpg`.
pub fn new_receipt_key() -> String {
    format!("{RECEIPT_KEY_PREFIX}/{}.jpg", Uuid::new_v4())
}

/// Binary storage addressed by key, with URLs that resolve to the stored bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Error>;

    /// Get a URL that downloads the object stored under `key`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no object under `key`.
    async fn url_for(&self, key: &str) -> Result<String, Error>;
}

/// An [ObjectStore] that keeps objects as files in a local directory.
///
/// The directory is expected to be served at [endpoints::OBJECTS] under
/// `public_base_url`, see [build_router](crate::build_router).
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    /// Create a store that writes into `root` and hands out URLs starting with
    /// `public_base_url`, e.g. "http://localhost:3000".
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The directory objects are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, Error> {
        validate_key(key)?;

        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), Error> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|error| {
                Error::ObjectStoreError(format!("could not create {}: {error}", parent.display()))
            })?;
        }

        tokio::fs::write(&path, bytes).await.map_err(|error| {
            Error::ObjectStoreError(format!("could not write {}: {error}", path.display()))
        })?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());

        Ok(())
    }

    async fn url_for(&self, key: &str) -> Result<String, Error> {
        let path = self.path_for(key)?;

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(format!(
                "{}{}/{key}",
                self.public_base_url,
                endpoints::OBJECTS
            )),
            Ok(false) => Err(Error::NotFound),
            Err(error) => Err(Error::ObjectStoreError(format!(
                "could not read {}: {error}",
                path.display()
            ))),
        }
    }
}

/// Keys are relative, slash separated paths without `.` or `..` segments.
fn validate_key(key: &str) -> Result<(), Error> {
    let is_valid = !key.is_empty()
        && !key.contains('\\')
        && Path::new(key)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));

    if is_valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!(
            "\"{key}\" is not a valid object key"
        )))
    }
}

#[cfg(test)]
mod local_object_store_tests {
    use crate::{
        Error, endpoints,
        object_store::{LocalObjectStore, ObjectStore, RECEIPT_KEY_PREFIX, new_receipt_key},
    };

    #[test]
    fn receipt_keys_are_unique_jpegs() {
        let first = new_receipt_key();
        let second = new_receipt_key();

        assert_ne!(first, second);
        assert!(first.starts_with(&format!("{RECEIPT_KEY_PREFIX}/")));
        assert!(first.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn put_then_url_for() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000/");

        store.put("receipts/a.jpg", b"jpeg bytes").await.unwrap();
        let url = store.url_for("receipts/a.jpg").await.unwrap();

        assert_eq!(
            url,
            format!("http://localhost:3000{}/receipts/a.jpg", endpoints::OBJECTS)
        );
        assert_eq!(
            std::fs::read(dir.path().join("receipts/a.jpg")).unwrap(),
            b"jpeg bytes"
        );
    }

    #[tokio::test]
    async fn url_for_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000");

        assert_eq!(store.url_for("receipts/missing.jpg").await, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn rejects_keys_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000");

        for key in ["", "../escape.jpg", "/etc/passwd", "receipts/../../x", "a\\b"] {
            let result = store.put(key, b"x").await;
            assert!(
                matches!(result, Err(Error::InvalidArgument(_))),
                "key {key:?} gave {result:?}"
            );
        }
    }
}
