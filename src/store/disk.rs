use crate::core::storage::Storage;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Stores the cache in a single file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Storage for FileStorage {
    fn reader(&self) -> Result<Box<dyn Read + '_>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open cache file: {}", self.path.display()))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn writer(&self) -> Result<Box<dyn Write + '_>> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create cache file: {}", self.path.display()))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
