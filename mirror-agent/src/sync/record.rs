//! The unit of comparison between remote and local state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fs::sanitize::sanitize;
use crate::provider::RawItem;

/// Path-keyed view of one side of the mirror at a point in time. An ordered
/// map, so iteration (and therefore planning) is deterministic.
pub type Snapshot = BTreeMap<String, ContentRecord>;

/// Identity and metadata for one mirrored item.
///
/// `path` is the identity key: unique within a snapshot and stable across
/// runs for the same logical item. `url` is ephemeral and advisory; the
/// durable re-download key is `file_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    pub file_id: i64,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub source: String,
}

impl ContentRecord {
    /// Build a record from a resolved remote item placed under `parent`
    /// (a sanitized relative directory, possibly empty).
    pub fn from_item(item: &RawItem, parent: &str, source: String) -> Self {
        let mut segment = sanitize(&item.name);
        if segment.is_empty() {
            // A name of only illegal characters would otherwise produce an
            // unusable path.
            segment = format!("file_{}", item.id);
        }
        let path = if parent.is_empty() {
            segment
        } else {
            format!("{}/{}", parent, segment)
        };

        Self {
            name: item.name.clone(),
            path,
            size: item.size,
            modified_at: item.modified_at,
            url: item.url.clone(),
            file_id: item.id,
            content_type: item.content_type.clone(),
            source,
        }
    }
}
