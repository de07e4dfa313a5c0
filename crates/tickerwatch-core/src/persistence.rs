//! Durable key-value substrate: one opaque blob per store name.

use std::collections::HashMap;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Mutex;

use crate::config::StorageConfig;
use crate::StorageError;

/// Async get/set of a named blob.
pub trait KeyValueStore: Send + Sync {
    /// Loads the blob stored under `name`; `Ok(None)` when nothing was ever saved.
    fn load<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + 'a>>;

    fn save<'a>(
        &'a self,
        name: &'a str,
        blob: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;
}

/// In-process store; contents live as long as the value.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, name: impl Into<String>, blob: impl Into<String>) -> Self {
        self.blobs
            .lock()
            .expect("memory store lock is not poisoned")
            .insert(name.into(), blob.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.blobs
            .lock()
            .expect("memory store lock is not poisoned")
            .get(name)
            .cloned()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn load<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.get(name)) })
    }

    fn save<'a>(
        &'a self,
        name: &'a str,
        blob: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.blobs
                .lock()
                .expect("memory store lock is not poisoned")
                .insert(name.to_owned(), blob);
            Ok(())
        })
    }
}

/// One `<name>.json` file per store under a state directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous blob intact.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.state_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }
}

fn io_error(name: &str, error: std::io::Error) -> StorageError {
    StorageError::Io {
        name: name.to_owned(),
        message: error.to_string(),
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn load<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, StorageError>> + Send + 'a>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.blob_path(name)).await {
                Ok(blob) => Ok(Some(blob)),
                Err(error) if error.kind() == ErrorKind::NotFound => Ok(None),
                Err(error) => Err(io_error(name, error)),
            }
        })
    }

    fn save<'a>(
        &'a self,
        name: &'a str,
        blob: String,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(|error| io_error(name, error))?;

            let target = self.blob_path(name);
            let staging = self.root.join(format!(".{name}.json.tmp"));
            tokio::fs::write(&staging, blob)
                .await
                .map_err(|error| io_error(name, error))?;
            tokio::fs::rename(&staging, &target)
                .await
                .map_err(|error| io_error(name, error))
        })
    }
}
