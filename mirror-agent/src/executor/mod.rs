//! Sync plan execution against the mirror directory.
//!
//! Applies one operation at a time: retryable atomic downloads for Add and
//! Update, archive moves for Delete, and carry-forward for Ignore. Failures
//! are counted, never propagated; the record list handed back for the next
//! manifest reflects exactly what is on disk when execution finishes.

pub mod manifest;

use std::path::{Path, PathBuf};

use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::fs::atomic;
use crate::provider::ContentProvider;
use crate::sync::planner::{OpKind, SyncOperation};
use crate::sync::record::ContentRecord;
use crate::utils::{MirrorError, Result};

/// Directory under the mirror root that receives soft-deleted files.
/// Never purged by the agent.
pub const ARCHIVE_DIR: &str = "_archive";

/// Outcome counts for one executed plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn merge(&mut self, other: &SyncReport) {
        self.added += other.added;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

/// Applies sync operations for one group.
pub struct MirrorExecutor<'a, P: ContentProvider> {
    provider: &'a P,
    group_id: i64,
    mirror_dir: PathBuf,
    archive_dir: PathBuf,
    max_attempts: u32,
}

impl<'a, P: ContentProvider> MirrorExecutor<'a, P> {
    pub fn new(provider: &'a P, group_id: i64, mirror_dir: &Path, max_attempts: u32) -> Self {
        Self {
            provider,
            group_id,
            mirror_dir: mirror_dir.to_path_buf(),
            archive_dir: mirror_dir.join(ARCHIVE_DIR),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Execute the plan sequentially. Individual failures are counted and
    /// never abort the remaining operations. Returns the outcome counts and
    /// the record set for the next manifest.
    pub async fn execute(&self, plan: Vec<SyncOperation>) -> (SyncReport, Vec<ContentRecord>) {
        let mut report = SyncReport::default();
        let mut records = Vec::with_capacity(plan.len());

        for operation in plan {
            match operation.kind {
                OpKind::Add | OpKind::Update => match self.download(&operation.record).await {
                    Ok(()) => {
                        match operation.kind {
                            OpKind::Add => report.added += 1,
                            _ => report.updated += 1,
                        }
                        records.push(operation.record);
                    }
                    Err(e) => {
                        // Omitting the record forces a retry on the next run.
                        warn!("Failed to download {}: {}", operation.record.path, e);
                        report.failed += 1;
                    }
                },
                OpKind::Delete => match self.archive(&operation.record).await {
                    Ok(()) => report.deleted += 1,
                    Err(e) => {
                        warn!("Failed to archive {}: {}", operation.record.path, e);
                        // Keep the record so the delete is reconsidered.
                        records.push(operation.record);
                        report.failed += 1;
                    }
                },
                OpKind::Ignore => {
                    report.unchanged += 1;
                    records.push(operation.record);
                }
            }
        }

        (report, records)
    }

    /// Download a record with retries, publishing atomically at its final
    /// path and preserving the remote modification time.
    async fn download(&self, record: &ContentRecord) -> Result<()> {
        let dest = self.mirror_dir.join(&record.path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let staged = atomic::staging_path(&dest);

        // The listing-fresh URL is good for the first attempt only; after a
        // failure (or when the listing carried none) re-resolve by id.
        let mut url = record.url.clone();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                sleep(Duration::from_secs(u64::from(attempt) - 1)).await;
            }

            let download_url = match url.take() {
                Some(listing_url) => listing_url,
                None => match self.provider.resolve_item(self.group_id, record.file_id).await {
                    Ok(item) => match item.url {
                        Some(fresh_url) => fresh_url,
                        None => {
                            last_error = Some(MirrorError::MissingUrl(record.path.clone()));
                            continue;
                        }
                    },
                    Err(e) => {
                        last_error = Some(e);
                        continue;
                    }
                },
            };

            match self.try_download(record, &download_url, &staged, &dest).await {
                Ok(()) => {
                    info!(
                        "Downloaded {} (attempt {}/{})",
                        record.path, attempt, self.max_attempts
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Download attempt {}/{} failed for {}: {}",
                        attempt, self.max_attempts, record.path, e
                    );
                    atomic::discard(&staged).await;
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| MirrorError::RetriesExhausted {
            path: record.path.clone(),
            attempts: self.max_attempts,
        }))
    }

    /// One download attempt: stream to the staging file, verify size, publish.
    async fn try_download(
        &self,
        record: &ContentRecord,
        url: &str,
        staged: &Path,
        dest: &Path,
    ) -> Result<()> {
        let written = self.provider.fetch(url, staged).await?;

        if record.size > 0 && written != record.size {
            return Err(MirrorError::SizeMismatch {
                path: record.path.clone(),
                expected: record.size,
                actual: written,
            });
        }

        atomic::publish(staged, dest).await?;

        if let Some(modified_at) = record.modified_at {
            // The content is already correct; a failed utime is not worth a
            // re-download.
            if let Err(e) = atomic::set_modified(dest, modified_at) {
                warn!("Failed to set modification time on {}: {}", dest.display(), e);
            }
        }
        Ok(())
    }

    /// Soft-delete: move the live file to the archive, mirroring its
    /// relative path. A file already gone counts as success.
    async fn archive(&self, record: &ContentRecord) -> Result<()> {
        let live = self.mirror_dir.join(&record.path);
        match tokio::fs::metadata(&live).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("File {} already gone, nothing to archive", record.path);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        let archived = self.archive_dir.join(&record.path);
        atomic::move_to_archive(&live, &archived).await?;
        info!("Moved {} to archive", record.path);
        Ok(())
    }
}
