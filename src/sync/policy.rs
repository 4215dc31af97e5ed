//! Per-mode decisions for the shared walk.

use tracing::debug;

use super::{SyncEngine, SyncSession};
use crate::{detect::files_are_same, error::SyncError, fs_tree::LocalEntry, store, terminal::readable_size};

/// What a mode does with an empty leaf directory and with a file.
///
/// `rel` is the `/`-joined path relative to the local root (empty for the
/// root itself).
pub(super) trait UploadPolicy {
    fn on_empty_dir(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        rel: &str,
    ) -> Result<(), SyncError>;

    fn on_file(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError>;
}

pub(super) struct Directly;

impl UploadPolicy for Directly {
    fn on_empty_dir(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        rel: &str,
    ) -> Result<(), SyncError> {
        engine.make_dir(session, rel)
    }

    fn on_file(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError> {
        engine.upload(session, file, rel)
    }
}

/// Shadow copy of the previous destination lives in `session.temp_dir`.
pub(super) struct Replace;

impl UploadPolicy for Replace {
    fn on_empty_dir(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        rel: &str,
    ) -> Result<(), SyncError> {
        engine.make_dir(session, rel)
    }

    fn on_file(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError> {
        let Some(temp) = session.temp_dir.clone() else {
            return engine.upload(session, file, rel);
        };
        let shadow = store::join(&temp, rel);

        engine.progress.set_message(&format!(
            "Checking file {} ({})",
            session.shown(rel),
            readable_size(file.size)
        ));
        if engine.exists(&shadow)? && files_are_same(&*engine.store, file, &shadow)? {
            return engine.move_file(session, &shadow, rel);
        }
        engine.upload(session, file, rel)
    }
}

pub(super) struct Merge;

impl UploadPolicy for Merge {
    fn on_empty_dir(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        rel: &str,
    ) -> Result<(), SyncError> {
        create_missing_dir(engine, session, rel)
    }

    fn on_file(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError> {
        let remote = session.remote_path(rel);
        engine.progress.set_message(&format!(
            "Checking file {} ({})",
            session.shown(rel),
            readable_size(file.size)
        ));
        if engine.exists(&remote)? && files_are_same(&*engine.store, file, &remote)? {
            engine.skip(session, rel);
            return Ok(());
        }
        engine.upload(session, file, rel)
    }
}

/// Like [`Merge`] but never compares content.
pub(super) struct UploadRemained;

impl UploadPolicy for UploadRemained {
    fn on_empty_dir(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        rel: &str,
    ) -> Result<(), SyncError> {
        create_missing_dir(engine, session, rel)
    }

    fn on_file(
        &self,
        engine: &mut SyncEngine<'_>,
        session: &mut SyncSession,
        file: &LocalEntry,
        rel: &str,
    ) -> Result<(), SyncError> {
        let remote = session.remote_path(rel);
        if engine.exists(&remote)? {
            engine.skip(session, rel);
            return Ok(());
        }
        engine.upload(session, file, rel)
    }
}

fn create_missing_dir(
    engine: &mut SyncEngine<'_>,
    session: &mut SyncSession,
    rel: &str,
) -> Result<(), SyncError> {
    let remote = session.remote_path(rel);
    engine
        .progress
        .set_message(&format!("Checking dir {}", session.shown(rel)));
    if engine.dir_exists(&remote)? {
        debug!(remote = %remote, "directory already present");
        return Ok(());
    }
    engine.make_dir(session, rel)
}
