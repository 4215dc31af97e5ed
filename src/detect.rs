//! Change detection between a local file and its uploaded counterpart.

use sha2::{Digest, Sha256};

use crate::{
    error::{RemoteOp, SyncError},
    fs_tree::LocalEntry,
    store::RemoteStore,
};

/// Content written in place of a zero-length file.
pub const EMPTY_FILE_SENTINEL: &[u8] = b" ";

/// Bytes treated as blank when reading back an empty-file sentinel.
const BLANK: &[u8] = b" \t\n\r\0\x0B";

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(|b| BLANK.contains(b))
}

/// Hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Whether `local` and the existing remote object at `remote` hold the same
/// content.
///
/// The caller must already know that `remote` exists.  Size is compared
/// first so content is only fetched when the sizes match.
pub fn files_are_same(
    store: &dyn RemoteStore,
    local: &LocalEntry,
    remote: &str,
) -> Result<bool, SyncError> {
    let remote_size = store
        .size(remote)
        .map_err(|e| SyncError::remote(RemoteOp::Read, remote, e))?;

    // A single blank byte is how an empty file was uploaded.
    if remote_size == 1 && local.size == 0 {
        let remote_content = store
            .get(remote)
            .map_err(|e| SyncError::remote(RemoteOp::Read, remote, e))?;
        if is_blank(&remote_content) {
            return Ok(true);
        }
    }

    if local.size != remote_size {
        return Ok(false);
    }

    let local_content = local.read()?;
    let remote_content = store
        .get(remote)
        .map_err(|e| SyncError::remote(RemoteOp::Read, remote, e))?;

    Ok(digest(&local_content) == digest(&remote_content))
}
