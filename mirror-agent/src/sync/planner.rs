//! Pure diff between a remote snapshot and the local manifest snapshot.

use crate::sync::record::{ContentRecord, Snapshot};

/// Timestamp skew tolerated as "unchanged", in milliseconds.
const MTIME_TOLERANCE_MS: i64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Update,
    Delete,
    Ignore,
}

/// One planned action for one relative path. Derived per run, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOperation {
    pub kind: OpKind,
    pub record: ContentRecord,
}

/// Diff two snapshots into an ordered operation list: exactly one operation
/// per remote path, plus one `Delete` per orphaned local path when enabled.
/// Adds and Updates come before Deletes so the mirror is never emptied
/// mid-run.
pub fn plan(remote: &Snapshot, local: &Snapshot, delete_removed: bool) -> Vec<SyncOperation> {
    let mut operations = Vec::with_capacity(remote.len());

    for (path, remote_record) in remote {
        let operation = match local.get(path) {
            None => SyncOperation {
                kind: OpKind::Add,
                record: remote_record.clone(),
            },
            Some(local_record) if needs_refresh(remote_record, local_record) => SyncOperation {
                kind: OpKind::Update,
                record: remote_record.clone(),
            },
            // Unchanged: carry the local record forward untouched.
            Some(local_record) => SyncOperation {
                kind: OpKind::Ignore,
                record: local_record.clone(),
            },
        };
        operations.push(operation);
    }

    if delete_removed {
        for (path, local_record) in local {
            if !remote.contains_key(path) {
                operations.push(SyncOperation {
                    kind: OpKind::Delete,
                    record: local_record.clone(),
                });
            }
        }
    }

    operations
}

/// A record needs a fresh download when sizes differ, or when both sides
/// carry a timestamp and they disagree by more than the tolerance. A
/// timestamp missing on one side alone never forces a download.
fn needs_refresh(remote: &ContentRecord, local: &ContentRecord) -> bool {
    if remote.size != local.size {
        return true;
    }
    if let (Some(remote_at), Some(local_at)) = (remote.modified_at, local.modified_at) {
        if (remote_at - local_at).num_milliseconds().abs() > MTIME_TOLERANCE_MS {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn record(path: &str, size: u64, modified_at: Option<DateTime<Utc>>) -> ContentRecord {
        ContentRecord {
            name: path.to_string(),
            path: path.to_string(),
            size,
            modified_at,
            url: None,
            file_id: 1,
            content_type: String::new(),
            source: "files".to_string(),
        }
    }

    fn snapshot(records: Vec<ContentRecord>) -> Snapshot {
        records.into_iter().map(|r| (r.path.clone(), r)).collect()
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_remote_only_is_add() {
        let plan = plan(&snapshot(vec![record("a.pdf", 10, None)]), &Snapshot::new(), false);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, OpKind::Add);
    }

    #[test]
    fn test_size_change_is_update() {
        let remote = snapshot(vec![record("a.pdf", 20, None)]);
        let local = snapshot(vec![record("a.pdf", 10, None)]);
        let plan = plan(&remote, &local, false);
        assert_eq!(plan[0].kind, OpKind::Update);
    }

    #[test]
    fn test_identical_is_ignore_and_carries_local_record() {
        let mut local_record = record("a.pdf", 10, Some(at()));
        local_record.source = "bundle:2".to_string();
        let remote = snapshot(vec![record("a.pdf", 10, Some(at()))]);
        let local = snapshot(vec![local_record.clone()]);

        let plan = plan(&remote, &local, true);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, OpKind::Ignore);
        assert_eq!(plan[0].record, local_record);
    }

    #[test]
    fn test_one_second_skew_is_tolerated() {
        let remote = snapshot(vec![record("a.pdf", 10, Some(at() + Duration::seconds(1)))]);
        let local = snapshot(vec![record("a.pdf", 10, Some(at()))]);
        assert_eq!(plan(&remote, &local, false)[0].kind, OpKind::Ignore);
    }

    #[test]
    fn test_more_than_one_second_skew_is_update() {
        let remote = snapshot(vec![record("a.pdf", 10, Some(at() + Duration::seconds(2)))]);
        let local = snapshot(vec![record("a.pdf", 10, Some(at()))]);
        assert_eq!(plan(&remote, &local, false)[0].kind, OpKind::Update);
    }

    #[test]
    fn test_one_sided_timestamp_alone_is_not_update() {
        let remote = snapshot(vec![record("a.pdf", 10, Some(at()))]);
        let local = snapshot(vec![record("a.pdf", 10, None)]);
        assert_eq!(plan(&remote, &local, false)[0].kind, OpKind::Ignore);

        let remote = snapshot(vec![record("a.pdf", 10, None)]);
        let local = snapshot(vec![record("a.pdf", 10, Some(at()))]);
        assert_eq!(plan(&remote, &local, false)[0].kind, OpKind::Ignore);
    }

    #[test]
    fn test_one_sided_timestamp_with_size_change_is_update() {
        let remote = snapshot(vec![record("a.pdf", 11, Some(at()))]);
        let local = snapshot(vec![record("a.pdf", 10, None)]);
        assert_eq!(plan(&remote, &local, false)[0].kind, OpKind::Update);
    }

    #[test]
    fn test_delete_gating() {
        let local = snapshot(vec![record("gone.pdf", 10, None)]);

        let without = plan(&Snapshot::new(), &local, false);
        assert!(without.is_empty());

        let with = plan(&Snapshot::new(), &local, true);
        assert_eq!(with.len(), 1);
        assert_eq!(with[0].kind, OpKind::Delete);
    }

    #[test]
    fn test_at_most_one_operation_per_path() {
        let remote = snapshot(vec![
            record("a.pdf", 10, None),
            record("b.pdf", 10, None),
        ]);
        let local = snapshot(vec![
            record("b.pdf", 20, None),
            record("c.pdf", 10, None),
        ]);

        let plan = plan(&remote, &local, true);
        let mut paths: Vec<&str> = plan.iter().map(|op| op.record.path.as_str()).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), plan.len());
    }

    #[test]
    fn test_adds_and_updates_before_deletes() {
        let remote = snapshot(vec![record("new.pdf", 10, None)]);
        let local = snapshot(vec![record("old.pdf", 10, None)]);

        let plan = plan(&remote, &local, true);
        assert_eq!(plan[0].kind, OpKind::Add);
        assert_eq!(plan[1].kind, OpKind::Delete);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let remote = snapshot(vec![
            record("a.pdf", 10, Some(at())),
            record("b.pdf", 20, None),
        ]);
        let local = snapshot(vec![
            record("a.pdf", 15, Some(at())),
            record("c.pdf", 5, None),
        ]);

        assert_eq!(plan(&remote, &local, true), plan(&remote, &local, true));
    }
}
