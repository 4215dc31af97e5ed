use std::{
    fs,
    path::{Path, PathBuf},
};

use super::{RemoteStore, StoreError};

/// A disk backed by a directory on the local filesystem.
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }

    fn ensure_parent(&self, target: &Path, path: &str) -> Result<(), StoreError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(path, e))?;
        }
        Ok(())
    }
}

impl RemoteStore for LocalStore {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(path).exists())
    }

    fn directory_exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(path).is_dir())
    }

    fn size(&self, path: &str) -> Result<u64, StoreError> {
        let target = self.resolve(path);
        if !target.is_file() {
            return Err(StoreError::Missing(path.to_string()));
        }
        fs::metadata(&target)
            .map(|m| m.len())
            .map_err(|e| StoreError::io(path, e))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let target = self.resolve(path);
        if !target.is_file() {
            return Err(StoreError::Missing(path.to_string()));
        }
        fs::read(&target).map_err(|e| StoreError::io(path, e))
    }

    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path);
        self.ensure_parent(&target, path)?;
        fs::write(&target, contents).map_err(|e| StoreError::io(path, e))
    }

    fn make_directory(&mut self, path: &str) -> Result<(), StoreError> {
        fs::create_dir_all(self.resolve(path)).map_err(|e| StoreError::io(path, e))
    }

    fn move_to(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        if from.trim_matches('/').is_empty() {
            return Err(StoreError::Rejected("refusing to move the disk root".into()));
        }
        let source = self.resolve(from);
        let target = self.resolve(to);
        if !source.exists() {
            return Err(StoreError::Missing(from.to_string()));
        }
        if target.exists() {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }
        self.ensure_parent(&target, to)?;
        fs::rename(&source, &target).map_err(|e| StoreError::io(from, e))
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let target = self.resolve(path);
        if !target.is_file() {
            return Err(StoreError::Missing(path.to_string()));
        }
        fs::remove_file(&target).map_err(|e| StoreError::io(path, e))
    }

    fn delete_directory(&mut self, path: &str) -> Result<(), StoreError> {
        if path.trim_matches('/').is_empty() {
            return Err(StoreError::Rejected("refusing to delete the disk root".into()));
        }
        let target = self.resolve(path);
        if !target.is_dir() {
            return Err(StoreError::Missing(path.to_string()));
        }
        fs::remove_dir_all(&target).map_err(|e| StoreError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_creates_parents_and_reads_back() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());

        store.put("a/b/c.txt", b"hello").unwrap();

        assert!(store.exists("a/b/c.txt").unwrap());
        assert!(store.directory_exists("a/b").unwrap());
        assert_eq!(store.size("a/b/c.txt").unwrap(), 5);
        assert_eq!(store.get("a/b/c.txt").unwrap(), b"hello");
    }

    #[test]
    fn move_renames_whole_directories() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());
        store.put("dest/x.txt", b"x").unwrap();
        store.make_directory("dest/empty").unwrap();

        store.move_to("dest", "shadow.tmp").unwrap();

        assert!(!store.exists("dest").unwrap());
        assert_eq!(store.get("shadow.tmp/x.txt").unwrap(), b"x");
        assert!(store.directory_exists("shadow.tmp/empty").unwrap());
    }

    #[test]
    fn move_refuses_to_clobber() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());
        store.put("a.txt", b"a").unwrap();
        store.put("b.txt", b"b").unwrap();
        assert!(matches!(
            store.move_to("a.txt", "b.txt"),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn delete_directory_requires_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());
        assert!(store.delete_directory("missing").is_err());

        store.put("gone/a.txt", b"a").unwrap();
        store.delete_directory("gone").unwrap();
        assert!(!store.exists("gone").unwrap());
    }

    #[test]
    fn disk_root_is_never_deleted_or_moved() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());
        store.put("keep.txt", b"k").unwrap();

        assert!(matches!(store.delete_directory("/"), Err(StoreError::Rejected(_))));
        assert!(matches!(store.move_to("", "x.tmp"), Err(StoreError::Rejected(_))));
        assert!(root.path().join("keep.txt").is_file());
    }

    #[test]
    fn leading_slash_stays_inside_root() {
        let root = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(root.path());
        store.put("/file.txt", b"f").unwrap();
        assert!(root.path().join("file.txt").is_file());
    }
}
