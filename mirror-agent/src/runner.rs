//! Orchestrates a full mirror run across groups.
//!
//! For each group: build the remote snapshot, load the manifest, plan, run
//! the executor, write the manifest back. One group failing entirely is
//! logged and excluded from the aggregate; the remaining groups still run.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::MirrorConfig;
use crate::executor::{manifest, MirrorExecutor, SyncReport};
use crate::fs::sanitize::group_dir_name;
use crate::provider::{ContentProvider, RemoteGroup};
use crate::sync::planner;
use crate::sync::remote::RemoteSnapshotBuilder;
use crate::utils::Result;

/// Outcome of mirroring one group.
#[derive(Debug)]
pub struct GroupReport {
    pub group_id: i64,
    pub group_name: String,
    pub report: SyncReport,
    pub remote_items: usize,
    /// False when the post-run manifest could not be written; downloaded
    /// files stay in place and the next run re-plans from the old state.
    pub manifest_written: bool,
}

/// Aggregate outcome of a run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub groups: Vec<GroupReport>,
    /// How many groups were selected for mirroring; a run where this is
    /// non-zero but `groups` is empty processed nothing at all.
    pub groups_selected: usize,
}

impl RunReport {
    pub fn totals(&self) -> SyncReport {
        let mut totals = SyncReport::default();
        for group in &self.groups {
            totals.merge(&group.report);
        }
        totals
    }
}

pub struct MirrorRun<'a, P: ContentProvider> {
    provider: &'a P,
    config: &'a MirrorConfig,
}

impl<'a, P: ContentProvider> MirrorRun<'a, P> {
    pub fn new(provider: &'a P, config: &'a MirrorConfig) -> Self {
        Self { provider, config }
    }

    /// Mirror every eligible group sequentially.
    ///
    /// Fails only when the provider cannot list groups at all; anything
    /// after that is contained per group.
    pub async fn run(&self) -> Result<RunReport> {
        let groups = self.provider.list_groups().await?;
        info!("Found {} groups", groups.len());

        let selected = self.select_groups(groups);
        info!("{} groups selected for mirroring", selected.len());

        let mut run_report = RunReport {
            groups: Vec::with_capacity(selected.len()),
            groups_selected: selected.len(),
        };

        for (index, group) in selected.iter().enumerate() {
            info!(
                "Mirroring group {}/{}: {} (ID: {})",
                index + 1,
                selected.len(),
                group.name,
                group.id
            );
            match self.sync_group(group).await {
                Ok(group_report) => run_report.groups.push(group_report),
                Err(e) => {
                    error!("Failed to mirror group {} (ID: {}): {}", group.name, group.id, e);
                }
            }
        }

        Ok(run_report)
    }

    /// Apply the explicit id filter when one is configured, otherwise the
    /// newest-cycle filter (unless all cycles were requested).
    fn select_groups(&self, groups: Vec<RemoteGroup>) -> Vec<RemoteGroup> {
        if !self.config.groups.is_empty() {
            let requested: HashSet<i64> = self.config.groups.iter().copied().collect();
            let selected: Vec<RemoteGroup> = groups
                .into_iter()
                .filter(|group| requested.contains(&group.id))
                .collect();
            if selected.len() < requested.len() {
                warn!(
                    "{} requested group(s) were not found remotely",
                    requested.len() - selected.len()
                );
            }
            return selected;
        }

        if self.config.all_cycles {
            return groups;
        }

        match groups.iter().filter_map(|group| group.cycle).max() {
            Some(newest) => {
                info!("Filtering to groups in cycle {}", newest);
                groups
                    .into_iter()
                    .filter(|group| group.cycle == Some(newest))
                    .collect()
            }
            // No group carries cycle information; mirror them all.
            None => groups,
        }
    }

    async fn sync_group(&self, group: &RemoteGroup) -> Result<GroupReport> {
        let mirror_dir = self.mirror_dir(group);
        tokio::fs::create_dir_all(&mirror_dir).await?;

        let remote = RemoteSnapshotBuilder::new(self.provider).build(group).await;
        let local = manifest::load(&mirror_dir);
        let plan = planner::plan(&remote, &local, self.config.delete_removed);

        let executor =
            MirrorExecutor::new(self.provider, group.id, &mirror_dir, self.config.max_attempts);
        let (report, records) = executor.execute(plan).await;

        let manifest_written = match manifest::save(&mirror_dir, records, Utc::now()) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to save manifest for group {}: {}", group.name, e);
                false
            }
        };

        info!(
            "Group {} done: {} added, {} updated, {} deleted, {} unchanged, {} failed",
            group.name, report.added, report.updated, report.deleted, report.unchanged, report.failed
        );

        Ok(GroupReport {
            group_id: group.id,
            group_name: group.name.clone(),
            report,
            remote_items: remote.len(),
            manifest_written,
        })
    }

    fn mirror_dir(&self, group: &RemoteGroup) -> PathBuf {
        self.config
            .root_dir
            .join(group_dir_name(group.id, &group.name))
    }
}
