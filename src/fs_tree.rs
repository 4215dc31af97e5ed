//! Local directory listings used to drive a sync run.
//!
//! Entries are returned sorted by file name so the walk order is stable
//! across platforms (`read_dir` itself gives no ordering guarantee).

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One immediate child of a local directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    /// Byte size for files, `0` for directories.
    pub size: u64,
}

impl LocalEntry {
    /// Reads the whole file.  Only called right before an upload or compare.
    /// Directories have no content.
    pub fn read(&self) -> Result<Vec<u8>, SyncError> {
        if self.kind == EntryKind::Directory {
            return Ok(Vec::new());
        }
        fs::read(&self.path).map_err(|e| SyncError::local(&self.path, e))
    }
}

fn list(dir: &Path, kind: EntryKind) -> Result<Vec<LocalEntry>, SyncError> {
    if !dir.is_dir() {
        return Err(SyncError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| SyncError::local(dir, e))? {
        let entry = entry.map_err(|e| SyncError::local(dir, e))?;
        let path = entry.path();
        // Follows symlinks; dangling links are skipped like missing files.
        let Ok(meta) = fs::metadata(&path) else {
            continue;
        };
        let found = if meta.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        if found != kind {
            continue;
        }
        entries.push(LocalEntry {
            path,
            kind,
            size: if meta.is_dir() { 0 } else { meta.len() },
        });
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(entries)
}

/// Immediate files of `dir`.
pub fn list_files(dir: &Path) -> Result<Vec<LocalEntry>, SyncError> {
    list(dir, EntryKind::File)
}

/// Immediate subdirectories of `dir`.
pub fn list_dirs(dir: &Path) -> Result<Vec<LocalEntry>, SyncError> {
    list(dir, EntryKind::Directory)
}

/// Files at every depth below `dir`.
pub fn count_all_nested_files(dir: &Path) -> Result<u64, SyncError> {
    let mut count = list_files(dir)?.len() as u64;
    for sub in list_dirs(dir)? {
        count += count_all_nested_files(&sub.path)?;
    }
    Ok(count)
}

/// Leaf-empty directories at every depth below `dir`.
///
/// A directory holding only empty subdirectories is not counted itself;
/// each empty leaf beneath it is.
pub fn count_nested_empty_folders(dir: &Path) -> Result<u64, SyncError> {
    let mut count = 0;
    for sub in list_dirs(dir)? {
        if is_leaf_empty(&sub.path)? {
            count += 1;
        } else {
            count += count_nested_empty_folders(&sub.path)?;
        }
    }
    Ok(count)
}

/// `true` when `dir` has no files and no subdirectories.
pub fn is_leaf_empty(dir: &Path) -> Result<bool, SyncError> {
    Ok(list_files(dir)?.is_empty() && list_dirs(dir)?.is_empty())
}
