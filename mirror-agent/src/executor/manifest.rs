//! Manifest types and I/O for one mirror directory.
//!
//! The manifest records what we believe is already mirrored. It is read at
//! the start of a run and written exactly once after execution completes, so
//! an interrupted run leaves the previous manifest intact and the next run
//! re-derives its plan from scratch.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::sync::record::{ContentRecord, Snapshot};
use crate::utils::Result;

/// Manifest file name inside each group's mirror directory.
pub const MANIFEST_NAME: &str = "manifest.json";

/// On-disk manifest: the mirrored records plus the last successful sync time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub files: Vec<ContentRecord>,
    pub last_sync: Option<DateTime<Utc>>,
}

pub fn manifest_path(mirror_dir: &Path) -> PathBuf {
    mirror_dir.join(MANIFEST_NAME)
}

/// Load the local snapshot from the manifest.
///
/// A missing or unreadable manifest yields an empty snapshot. An entry whose
/// backing file is no longer a regular file is dropped, so the planner
/// classifies the corresponding remote item as an Add rather than trusting a
/// record with nothing behind it.
pub fn load(mirror_dir: &Path) -> Snapshot {
    let path = manifest_path(mirror_dir);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::new(),
        Err(e) => {
            warn!("Failed to read manifest {}: {}", path.display(), e);
            return Snapshot::new();
        }
    };

    let manifest: Manifest = match serde_json::from_str(&raw) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Failed to parse manifest {}: {}", path.display(), e);
            return Snapshot::new();
        }
    };

    let mut snapshot = Snapshot::new();
    for record in manifest.files {
        if mirror_dir.join(&record.path).is_file() {
            snapshot.insert(record.path.clone(), record);
        } else {
            debug!("Dropping manifest entry without backing file: {}", record.path);
        }
    }
    snapshot
}

/// Overwrite the manifest with the post-run record set.
pub fn save(mirror_dir: &Path, files: Vec<ContentRecord>, last_sync: DateTime<Utc>) -> Result<()> {
    let manifest = Manifest {
        files,
        last_sync: Some(last_sync),
    };
    let path = manifest_path(mirror_dir);
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&path, json)?;
    info!("Saved manifest to {}", path.display());
    Ok(())
}
