//! Atomic file placement for the mirror directory.
//!
//! Downloads land in a staging file next to their destination and are
//! published with a rename, so a reader polling the final path only ever
//! sees the previous file or the complete new one.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use filetime::FileTime;
use tracing::warn;

use crate::utils::Result;

/// Staging path used while downloading `dest`: `<file name>.tmp` in the
/// same directory, so the final rename never crosses a filesystem.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Publish a fully-written staging file at `dest`, replacing any previous
/// file in a single rename.
pub async fn publish(staged: &Path, dest: &Path) -> Result<()> {
    tokio::fs::rename(staged, dest).await?;
    Ok(())
}

/// Best-effort removal of a leftover staging file.
pub async fn discard(staged: &Path) {
    if let Err(e) = tokio::fs::remove_file(staged).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove staging file {}: {}", staged.display(), e);
        }
    }
}

/// Set a file's modification time to the remote timestamp.
pub fn set_modified(path: &Path, modified_at: DateTime<Utc>) -> Result<()> {
    let mtime = FileTime::from_unix_time(
        modified_at.timestamp(),
        modified_at.timestamp_subsec_nanos(),
    );
    filetime::set_file_mtime(path, mtime)?;
    Ok(())
}

/// Move a live file to the matching path under the archive root, creating
/// parent directories as needed.
pub async fn move_to_archive(live: &Path, archived: &Path) -> Result<()> {
    if let Some(parent) = archived.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::rename(live, archived).await?;
    Ok(())
}
