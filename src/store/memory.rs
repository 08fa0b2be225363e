use crate::core::storage::Storage;
use anyhow::{Result, anyhow};
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory storage. Clones share the same buffer, so a test can keep a
/// handle and inspect what the pipeline persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStorage {
    /// Creates a storage with nothing stored, which reads like a missing file.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(content: &[u8]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(content.to_vec()))),
        }
    }

    /// Returns a copy of the stored bytes, if anything was ever written.
    pub fn content(&self) -> Option<Vec<u8>> {
        self.lock().ok().and_then(|guard| guard.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Vec<u8>>>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("Memory storage lock poisoned"))
    }
}

struct MemoryWriter<'a> {
    guard: MutexGuard<'a, Option<Vec<u8>>>,
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.get_or_insert_with(Vec::new).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn reader(&self) -> Result<Box<dyn Read + '_>> {
        let content = self
            .lock()?
            .clone()
            .ok_or_else(|| anyhow!("Nothing stored in memory"))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn writer(&self) -> Result<Box<dyn Write + '_>> {
        let mut guard = self.lock()?;
        *guard = Some(Vec::new());
        Ok(Box::new(MemoryWriter { guard }))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
