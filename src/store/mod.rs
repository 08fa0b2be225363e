pub mod disk;
pub mod memory;

pub use disk::FileStorage;
pub use memory::MemoryStorage;

use crate::core::storage::Storage;
use std::path::Path;
use std::sync::Arc;

/// Location written to when no per-user cache directory can be determined.
#[cfg(windows)]
pub const DISCARD_PATH: &str = "NUL";
#[cfg(not(windows))]
pub const DISCARD_PATH: &str = "/dev/null";

/// Opens the cache backing store at `path`.
pub fn open(path: &Path) -> Arc<dyn Storage> {
    Arc::new(FileStorage::new(path))
}
