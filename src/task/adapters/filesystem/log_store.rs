//! Operation logs stored as one file per operation.

use super::{ignore_missing, open_root};
use crate::task::ports::{LogSink, LogStore, LogStoreError, LogStoreResult, OperationKind};
use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use std::io::{self, Read};
use std::sync::Arc;
use uuid::Uuid;

/// Stores logs under `<root>/logs/<kind>-<operation-id>.log`.
#[derive(Debug, Clone)]
pub struct FsLogStore {
    dir: Arc<Dir>,
}

impl FsLogStore {
    /// Opens the store, creating `<root>/logs` when missing.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Persistence`] when the directory cannot be
    /// created or opened.
    pub fn open(root: &Utf8Path) -> LogStoreResult<Self> {
        let dir = open_root(root, "logs").map_err(LogStoreError::persistence)?;
        Ok(Self { dir: Arc::new(dir) })
    }

    fn file_name(kind: OperationKind, id: Uuid) -> String {
        format!("{kind}-{id}.log")
    }
}

impl LogStore for FsLogStore {
    fn new_log_writer(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<LogSink> {
        let file = self
            .dir
            .create(Self::file_name(kind, id))
            .map_err(LogStoreError::persistence)?;
        Ok(Box::new(file))
    }

    fn load_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<Box<dyn Read + Send>> {
        match self.dir.open(Self::file_name(kind, id)) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(LogStoreError::NotFound { kind, id })
            }
            Err(err) => Err(LogStoreError::persistence(err)),
        }
    }

    fn delete_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<()> {
        ignore_missing(self.dir.remove_file(Self::file_name(kind, id)))
            .map_err(LogStoreError::persistence)
    }
}
