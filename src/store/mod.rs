//! The storage capability the sync engine uploads into.
//!
//! Paths are `/`-separated strings relative to the disk root.  Reads return
//! their value; mutating calls return `Ok(())` on success and any `Err` is
//! treated by the engine as a hard failure of the whole run.

mod local;
#[cfg(test)]
pub mod memory;

use std::io;

use thiserror::Error;

pub use local::LocalStore;

use crate::config::DiskConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} does not exist")]
    Missing(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("{0}")]
    Rejected(String),

    #[error("unsupported disk driver '{0}'")]
    UnsupportedDriver(String),

    #[error("disk has no `root` configured")]
    NoRoot,
}

impl StoreError {
    pub(crate) fn io(path: &str, source: io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Minimal object-store surface consumed by the engine.
pub trait RemoteStore {
    /// `true` for both files and directories.
    fn exists(&self, path: &str) -> Result<bool, StoreError>;
    fn directory_exists(&self, path: &str) -> Result<bool, StoreError>;
    fn size(&self, path: &str) -> Result<u64, StoreError>;
    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite `path`, creating parents as needed.
    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), StoreError>;
    fn make_directory(&mut self, path: &str) -> Result<(), StoreError>;
    /// Move a file or a whole directory.
    fn move_to(&mut self, from: &str, to: &str) -> Result<(), StoreError>;
    fn delete(&mut self, path: &str) -> Result<(), StoreError>;
    /// Recursive delete.
    fn delete_directory(&mut self, path: &str) -> Result<(), StoreError>;
}

/// Open the adapter for a configured disk.
pub fn open_store(disk: &DiskConfig) -> Result<Box<dyn RemoteStore>, StoreError> {
    match disk.driver.as_str() {
        "local" => {
            let root = disk.root_path().ok_or(StoreError::NoRoot)?;
            Ok(Box::new(LocalStore::new(root)))
        },
        other => Err(StoreError::UnsupportedDriver(other.to_string())),
    }
}

/// Join a remote base and a relative part with a single `/`.
pub fn join(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{rel}"),
    }
}
