//! Error types for the sync engine and its collaborators.
//!
//! Command handlers wrap these in `anyhow` the same way they wrap config and
//! I/O errors; the engine itself only ever returns [`SyncError`].

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Which remote call failed.  Rendered into the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Check,
    Read,
    CreateDirectory,
    CreateFile,
    Move,
    DeleteDirectory,
    Delete,
}

impl RemoteOp {
    const fn verb(self) -> &'static str {
        match self {
            Self::Check => "check path",
            Self::Read => "read file",
            Self::CreateDirectory => "create directory",
            Self::CreateFile => "create file",
            Self::Move => "move",
            Self::DeleteDirectory => "delete directory",
            Self::Delete => "delete file",
        }
    }
}

impl std::fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

/// Fatal outcomes of a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local source directory does not exist.
    #[error("Directory not found {}", path.display())]
    NotFound { path: PathBuf },

    /// The local source directory contains neither files nor directories.
    #[error("{} Does not have any file or folder.", path.display())]
    EmptyTree { path: PathBuf },

    /// A RemoteStore call failed; the run is aborted at this point.
    #[error(
        "Couldn't {op} in disk path {path}. Check your connection, or set disk authorization tokens."
    )]
    RemoteOperation {
        op: RemoteOp,
        path: String,
        #[source]
        source: StoreError,
    },

    /// Reading the local tree failed mid-run.
    #[error("reading {}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `SelectNewName` must be resolved by the caller before running.
    #[error("a new destination must be chosen before uploading")]
    UnresolvedDestination,
}

impl SyncError {
    pub(crate) fn remote(op: RemoteOp, path: impl Into<String>, source: StoreError) -> Self {
        Self::RemoteOperation {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_names_path_and_hints_at_auth() {
        let err = SyncError::remote(
            RemoteOp::CreateDirectory,
            "backups/some/empty",
            StoreError::Rejected("denied".into()),
        );
        let msg = err.to_string();
        assert!(msg.contains("create directory"));
        assert!(msg.contains("backups/some/empty"));
        assert!(msg.contains("authorization tokens"));
    }

    #[test]
    fn not_found_message_matches_cli_wording() {
        let err = SyncError::NotFound {
            path: "some/not/found/path".into(),
        };
        insta::assert_snapshot!(err.to_string(), @"Directory not found some/not/found/path");
    }

    #[test]
    fn empty_tree_message_names_directory() {
        let err = SyncError::EmptyTree {
            path: "/tmp/nothing".into(),
        };
        insta::assert_snapshot!(err.to_string(), @"/tmp/nothing Does not have any file or folder.");
    }
}
