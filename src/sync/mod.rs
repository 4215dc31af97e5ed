//! Directory upload engine.
//!
//! One depth-first walk drives every upload mode.  At each directory the
//! immediate files are visited first, then the subdirectories; a directory
//! with neither is an "empty leaf" and is recreated remotely.  What happens
//! to each file and each empty leaf is decided by the mode's
//! [`policy::UploadPolicy`].
//!
//! | Mode             | Empty leaf                 | File                                         |
//! |------------------|----------------------------|----------------------------------------------|
//! | `Directly`       | create                     | upload                                       |
//! | `Replace`        | create                     | move from the shadow copy if same, else upload |
//! | `Merge`          | create if missing          | upload if missing or different               |
//! | `UploadRemained` | create if missing          | upload if missing                            |
//!
//! `FreshDir` deletes the destination and then behaves like `Directly`.
//! `DeleteFromDisk` deletes the destination and does not walk at all.
//!
//! Every file and every empty leaf is one progress step, so a finished run
//! always reports `count_all_nested_files + count_nested_empty_folders`
//! steps.

mod policy;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    detect::EMPTY_FILE_SENTINEL,
    error::{RemoteOp, SyncError},
    fs_tree::{self, LocalEntry},
    store::{self, RemoteStore},
    terminal::readable_size,
};

use policy::{Directly, Merge, Replace, UploadPolicy, UploadRemained};

/// How an upload treats a destination that may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Destination is new; upload everything.
    Directly,
    /// Move the old destination aside, upload, reuse identical files, then
    /// delete the old copy.
    Replace,
    /// Upload only missing or changed files.
    Merge,
    /// Upload only missing files.
    UploadRemained,
    /// Delete the destination and stop.
    DeleteFromDisk,
    /// Delete the destination, then upload everything.
    FreshDir,
    /// Pick another destination.  Resolved by the caller, never run.
    SelectNewName,
}

impl UploadMode {
    /// Choices offered when the destination already exists.
    pub const EXISTING_CHOICES: [Self; 6] = [
        Self::DeleteFromDisk,
        Self::SelectNewName,
        Self::Replace,
        Self::Merge,
        Self::UploadRemained,
        Self::FreshDir,
    ];

    pub const fn describe(self) -> &'static str {
        match self {
            Self::Directly => "upload to disk",
            Self::Replace => "replace it",
            Self::Merge => "merge it with uploaded one",
            Self::UploadRemained => "upload remained files",
            Self::DeleteFromDisk => "delete dir from disk",
            Self::FreshDir => "delete it, then upload",
            Self::SelectNewName => "select new name for destination",
        }
    }
}

impl std::fmt::Display for UploadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Progress sink.  One `advance` per step.
pub trait Progress {
    fn start(&mut self, total: u64);
    fn set_message(&mut self, text: &str);
    fn advance(&mut self);
    fn finish(&mut self);
}

/// Receives one event per transferred file and per created directory.
///
/// Paths are as shown to the user: the source directory name joined with the
/// path below it.
pub trait UploadLog {
    fn file_uploaded(&mut self, shown: &str, size: u64);
    fn dir_created(&mut self, shown: &str);
}

/// Mutable state of one run.
#[derive(Debug)]
pub struct SyncSession {
    pub mode: UploadMode,
    pub local_root: PathBuf,
    pub remote_root: String,
    pub total_steps: u64,
    pub completed_steps: u64,
    pub uploaded_bytes: u64,
    /// Where the previous destination was moved to (`Replace` only).
    pub temp_dir: Option<String>,
    files_uploaded: u64,
    files_moved: u64,
    files_skipped: u64,
    dirs_created: u64,
}

impl SyncSession {
    fn new(mode: UploadMode, local_root: &Path, remote_root: &str, total_steps: u64) -> Self {
        Self {
            mode,
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.trim_end_matches('/').to_string(),
            total_steps,
            completed_steps: 0,
            uploaded_bytes: 0,
            temp_dir: None,
            files_uploaded: 0,
            files_moved: 0,
            files_skipped: 0,
            dirs_created: 0,
        }
    }

    /// `/`-joined path of `path` relative to the local root.
    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.local_root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    fn remote_path(&self, rel: &str) -> String {
        store::join(&self.remote_root, rel)
    }

    /// Path as shown to the user: source directory name plus `rel`.
    fn shown(&self, rel: &str) -> String {
        let base = self
            .local_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        store::join(&base, rel)
    }

    fn summary(&self) -> SyncSummary {
        SyncSummary {
            total_bytes_uploaded: self.uploaded_bytes,
            steps: self.completed_steps,
            files_uploaded: self.files_uploaded,
            files_moved: self.files_moved,
            files_skipped: self.files_skipped,
            dirs_created: self.dirs_created,
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    /// Local bytes of every file actually transferred.
    pub total_bytes_uploaded: u64,
    pub steps: u64,
    pub files_uploaded: u64,
    pub files_moved: u64,
    pub files_skipped: u64,
    pub dirs_created: u64,
}

/// Drives one upload against a store.
pub struct SyncEngine<'a> {
    store: &'a mut dyn RemoteStore,
    progress: &'a mut dyn Progress,
    log: &'a mut dyn UploadLog,
}

/// Name for the shadow copy of a replaced destination.
pub fn temp_dir_name() -> String {
    format!(
        "{}{}.tmp",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        store: &'a mut dyn RemoteStore,
        progress: &'a mut dyn Progress,
        log: &'a mut dyn UploadLog,
    ) -> Self {
        Self {
            store,
            progress,
            log,
        }
    }

    /// Upload `local_root` to `remote_root` using `mode`.
    pub fn run(
        &mut self,
        mode: UploadMode,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<SyncSummary, SyncError> {
        if !local_root.is_dir() {
            return Err(SyncError::NotFound {
                path: local_root.to_path_buf(),
            });
        }

        let policy: Box<dyn UploadPolicy> = match mode {
            UploadMode::SelectNewName => return Err(SyncError::UnresolvedDestination),
            UploadMode::DeleteFromDisk => {
                self.delete_directory(remote_root)?;
                info!(remote_root, "deleted destination");
                return Ok(SyncSummary::default());
            },
            UploadMode::Directly | UploadMode::FreshDir => Box::new(Directly),
            UploadMode::Merge => Box::new(Merge),
            UploadMode::UploadRemained => Box::new(UploadRemained),
            UploadMode::Replace => Box::new(Replace),
        };

        let total = fs_tree::count_all_nested_files(local_root)?
            + fs_tree::count_nested_empty_folders(local_root)?;
        if total == 0 {
            return Err(SyncError::EmptyTree {
                path: local_root.to_path_buf(),
            });
        }

        let mut session = SyncSession::new(mode, local_root, remote_root, total);
        match mode {
            UploadMode::FreshDir if self.dir_exists(&session.remote_root)? => {
                self.delete_directory(&session.remote_root)?;
            },
            UploadMode::Replace => {
                let temp = temp_dir_name();
                self.store
                    .move_to(&session.remote_root, &temp)
                    .map_err(|e| SyncError::remote(RemoteOp::CreateDirectory, &temp, e))?;
                warn!(
                    "moved {}/ to {temp}; don't remove it, it is deleted after upload",
                    session.remote_root
                );
                session.temp_dir = Some(temp);
            },
            _ => {},
        }

        debug!(mode = %session.mode, steps = session.total_steps, "starting walk");
        self.progress.start(total);
        self.walk(policy.as_ref(), &mut session, local_root)?;
        self.progress.finish();

        if let Some(temp) = session.temp_dir.as_deref() {
            self.delete_directory(temp)?;
            info!(temp, "removed shadow copy");
        }

        if session.completed_steps != session.total_steps {
            warn!(
                completed = session.completed_steps,
                expected = session.total_steps,
                "local tree changed during upload"
            );
        }

        Ok(session.summary())
    }

    /// Upload a single file to `remote`, overwriting what is there.
    ///
    /// Returns the local byte size.
    pub fn upload_single(&mut self, local: &Path, remote: &str) -> Result<u64, SyncError> {
        let meta = std::fs::metadata(local).map_err(|e| SyncError::local(local, e))?;
        let entry = LocalEntry {
            path: local.to_path_buf(),
            kind: fs_tree::EntryKind::File,
            size: meta.len(),
        };
        let shown = local
            .file_name()
            .map_or_else(|| remote.to_string(), |n| n.to_string_lossy().into_owned());
        self.put_file(&entry, remote, &shown)?;
        Ok(entry.size)
    }

    fn walk(
        &mut self,
        policy: &dyn UploadPolicy,
        session: &mut SyncSession,
        dir: &Path,
    ) -> Result<(), SyncError> {
        let files = fs_tree::list_files(dir)?;
        let dirs = fs_tree::list_dirs(dir)?;

        if files.is_empty() && dirs.is_empty() {
            let rel = session.relative(dir);
            policy.on_empty_dir(self, session, &rel)?;
            self.step(session);
        }

        for file in &files {
            let rel = session.relative(&file.path);
            policy.on_file(self, session, file, &rel)?;
            self.step(session);
        }

        for sub in &dirs {
            self.walk(policy, session, &sub.path)?;
        }

        Ok(())
    }

    fn step(&mut self, session: &mut SyncSession) {
        session.completed_steps += 1;
        self.progress.advance();
    }

    // ── store helpers shared by the policies ─────────────────────────────────

    fn exists(&self, remote: &str) -> Result<bool, SyncError> {
        self.store
            .exists(remote)
            .map_err(|e| SyncError::remote(RemoteOp::Check, remote, e))
    }

    fn dir_exists(&self, remote: &str) -> Result<bool, SyncError> {
        self.store
            .directory_exists(remote)
            .map_err(|e| SyncError::remote(RemoteOp::Check, remote, e))
    }

    fn delete_directory(&mut self, remote: &str) -> Result<(), SyncError> {
        self.store
            .delete_directory(remote)
            .map_err(|e| SyncError::remote(RemoteOp::DeleteDirectory, remote, e))
    }

    /// Store `file` at `remote`; the log line names it `shown`.
    fn put_file(&mut self, file: &LocalEntry, remote: &str, shown: &str) -> Result<(), SyncError> {
        let mut contents = file.read()?;
        if contents.is_empty() {
            contents = EMPTY_FILE_SENTINEL.to_vec();
        }
        self.store
            .put(remote, &contents)
            .map_err(|e| SyncError::remote(RemoteOp::CreateFile, remote, e))?;
        self.log.file_uploaded(shown, file.size);
        Ok(())
    }

    fn upload(
        &mut self,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError> {
        let remote = session.remote_path(rel);
        self.progress.set_message(&format!(
            "Uploading {} ({})",
            session.shown(rel),
            readable_size(file.size)
        ));
        debug!(remote = %remote, size = file.size, "upload");
        self.put_file(file, &remote, &session.shown(rel))?;
        session.uploaded_bytes += file.size;
        session.files_uploaded += 1;
        Ok(())
    }

    fn make_dir(&mut self, session: &mut SyncSession, rel: &str) -> Result<(), SyncError> {
        let remote = session.remote_path(rel);
        self.progress
            .set_message(&format!("mkdir {}", session.shown(rel)));
        debug!(remote = %remote, "mkdir");
        self.store
            .make_directory(&remote)
            .map_err(|e| SyncError::remote(RemoteOp::CreateDirectory, &remote, e))?;
        self.log.dir_created(&session.shown(rel));
        session.dirs_created += 1;
        Ok(())
    }

    fn move_file(
        &mut self,
        session: &mut SyncSession,
        from: &str,
        rel: &str,
    ) -> Result<(), SyncError> {
        let to = session.remote_path(rel);
        self.progress
            .set_message(&format!("moving {from} to {to}"));
        debug!(from, to = %to, "reuse unchanged file");
        self.store
            .move_to(from, &to)
            .map_err(|e| SyncError::remote(RemoteOp::Move, from, e))?;
        session.files_moved += 1;
        Ok(())
    }

    fn skip(&mut self, session: &mut SyncSession, rel: &str) {
        debug!(rel, "unchanged, skipped");
        session.files_skipped += 1;
    }
}
