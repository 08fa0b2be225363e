//! Backing store abstraction for the persisted rate cache.

use anyhow::Result;
use std::io::{Read, Write};

/// A single byte-stream location with read-then-overwrite semantics.
pub trait Storage: Send + Sync {
    /// Opens the stored bytes for reading. A missing location is an error.
    fn reader(&self) -> Result<Box<dyn Read + '_>>;

    /// Opens the location for writing, discarding any previous content.
    fn writer(&self) -> Result<Box<dyn Write + '_>>;

    /// Human readable description of the location, used in logs.
    fn location(&self) -> String;
}
