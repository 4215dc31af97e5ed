//! In-memory store for engine tests.  Counts every mutating call.

use std::collections::{BTreeMap, BTreeSet};

use super::{RemoteStore, StoreError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub put: usize,
    pub make_directory: usize,
    pub move_to: usize,
    pub delete: usize,
    pub delete_directory: usize,
}

impl Calls {
    pub const fn writes(&self) -> usize {
        self.put + self.make_directory + self.move_to + self.delete + self.delete_directory
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub calls: Calls,
    /// Any mutating call touching this exact path fails.
    pub fail_on: Option<String>,
    /// Mutating calls fail when this returns true for `(call, path)`, where
    /// `call` is the trait method name.
    pub fail_if: Option<fn(&str, &str) -> bool>,
}

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.insert_file(path, contents);
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert_dir(path);
        self
    }

    pub fn reset_calls(&mut self) {
        self.calls = Calls::default();
    }

    fn insert_dir(&mut self, path: &str) {
        let mut acc = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !acc.is_empty() {
                acc.push('/');
            }
            acc.push_str(part);
            self.dirs.insert(acc.clone());
        }
    }

    fn insert_file(&mut self, path: &str, contents: &[u8]) {
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.insert_dir(parent);
        }
        self.files.insert(path.to_string(), contents.to_vec());
    }

    fn check(&self, call: &str, path: &str) -> Result<(), StoreError> {
        let hit = self.fail_on.as_deref() == Some(path)
            || self.fail_if.is_some_and(|fail| fail(call, path));
        if hit {
            return Err(StoreError::Rejected(format!("injected failure on {call} {path}")));
        }
        Ok(())
    }
}

impl RemoteStore for MemoryStore {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.files.contains_key(path) || self.dirs.contains(path))
    }

    fn directory_exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.dirs.contains(path))
    }

    fn size(&self, path: &str) -> Result<u64, StoreError> {
        self.files
            .get(path)
            .map(|c| c.len() as u64)
            .ok_or_else(|| StoreError::Missing(path.to_string()))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::Missing(path.to_string()))
    }

    fn put(&mut self, path: &str, contents: &[u8]) -> Result<(), StoreError> {
        self.calls.put += 1;
        self.check("put", path)?;
        self.insert_file(path, contents);
        Ok(())
    }

    fn make_directory(&mut self, path: &str) -> Result<(), StoreError> {
        self.calls.make_directory += 1;
        self.check("make_directory", path)?;
        self.insert_dir(path);
        Ok(())
    }

    fn move_to(&mut self, from: &str, to: &str) -> Result<(), StoreError> {
        self.calls.move_to += 1;
        self.check("move_to", from)?;
        self.check("move_to", to)?;
        if self.exists(to)? {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }

        if let Some(contents) = self.files.remove(from) {
            self.insert_file(to, &contents);
            return Ok(());
        }
        if !self.dirs.contains(from) {
            return Err(StoreError::Missing(from.to_string()));
        }

        let files: Vec<String> = self
            .files
            .keys()
            .filter(|p| under(p, from))
            .cloned()
            .collect();
        let dirs: Vec<String> = self
            .dirs
            .iter()
            .filter(|p| p.as_str() == from || under(p, from))
            .cloned()
            .collect();
        for d in &dirs {
            self.dirs.remove(d);
            let moved = format!("{to}{}", &d[from.len()..]);
            self.insert_dir(&moved);
        }
        for f in files {
            if let Some(contents) = self.files.remove(&f) {
                let moved = format!("{to}{}", &f[from.len()..]);
                self.insert_file(&moved, &contents);
            }
        }
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        self.calls.delete += 1;
        self.check("delete", path)?;
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StoreError::Missing(path.to_string()))
    }

    fn delete_directory(&mut self, path: &str) -> Result<(), StoreError> {
        self.calls.delete_directory += 1;
        self.check("delete_directory", path)?;
        if !self.dirs.contains(path) {
            return Err(StoreError::Missing(path.to_string()));
        }
        self.files.retain(|p, _| !under(p, path));
        self.dirs.retain(|p| p != path && !under(p, path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_a_directory_carries_its_contents() {
        let mut store = MemoryStore::new()
            .with_file("dest/a.txt", b"a")
            .with_dir("dest/empty");

        store.move_to("dest", "tmp").unwrap();

        assert!(!store.exists("dest").unwrap());
        assert_eq!(store.get("tmp/a.txt").unwrap(), b"a");
        assert!(store.directory_exists("tmp/empty").unwrap());
    }

    #[test]
    fn failure_predicate_sees_call_and_path() {
        let mut store = MemoryStore {
            fail_if: Some(|call, path| call == "delete_directory" && path.ends_with(".tmp")),
            ..MemoryStore::default()
        }
        .with_dir("x.tmp");

        store.make_directory("y.tmp").unwrap();
        assert!(matches!(
            store.delete_directory("x.tmp"),
            Err(StoreError::Rejected(_))
        ));
        assert!(store.directory_exists("x.tmp").unwrap());
    }

    #[test]
    fn prefix_match_respects_path_boundaries() {
        let mut store = MemoryStore::new()
            .with_file("dest/a.txt", b"a")
            .with_file("destination/b.txt", b"b");

        store.delete_directory("dest").unwrap();

        assert!(store.exists("destination/b.txt").unwrap());
    }
}
