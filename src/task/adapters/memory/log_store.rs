//! In-memory operation log store.

use crate::task::ports::{LogSink, LogStore, LogStoreError, LogStoreResult, OperationKind};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

type LogKey = (OperationKind, Uuid);
type LogBuffer = Arc<Mutex<Vec<u8>>>;

/// Thread-safe in-memory log store.
///
/// Writers append to a shared buffer, so output is readable while the
/// operation is still running.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogStore {
    logs: Arc<RwLock<HashMap<LogKey, LogBuffer>>>,
}

impl InMemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether a log exists.
    ///
    /// # Errors
    ///
    /// Returns [`LogStoreError::Persistence`] when the lock is poisoned.
    pub fn contains(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<bool> {
        let logs = self.logs.read().map_err(poisoned)?;
        Ok(logs.contains_key(&(kind, id)))
    }
}

fn poisoned(err: impl ToString) -> LogStoreError {
    LogStoreError::persistence(io::Error::other(err.to_string()))
}

struct BufferWriter(LogBuffer);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogStore for InMemoryLogStore {
    fn new_log_writer(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<LogSink> {
        let buffer = LogBuffer::default();
        let mut logs = self.logs.write().map_err(poisoned)?;
        logs.insert((kind, id), Arc::clone(&buffer));
        Ok(Box::new(BufferWriter(buffer)))
    }

    fn load_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<Box<dyn Read + Send>> {
        let logs = self.logs.read().map_err(poisoned)?;
        let buffer = logs
            .get(&(kind, id))
            .ok_or(LogStoreError::NotFound { kind, id })?;
        let bytes = buffer.lock().map_err(poisoned)?.clone();
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn delete_log(&self, kind: OperationKind, id: Uuid) -> LogStoreResult<()> {
        let mut logs = self.logs.write().map_err(poisoned)?;
        logs.remove(&(kind, id));
        Ok(())
    }
}
