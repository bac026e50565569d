//! Remote content provider boundary.
//!
//! Every ambiguity of the remote service (missing fields, listings a group
//! does not support) is resolved here, so the sync engine only ever works
//! with fully-validated typed values. The trait is annotated for `mockall`
//! so tests can drive the engine without a network.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(any(test, feature = "test-mocks"))]
use mockall::automock;
use serde::Deserialize;

use crate::utils::Result;

pub mod http;

pub use http::HttpProvider;

/// A top-level remote group eligible for mirroring.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteGroup {
    pub id: i64,
    pub name: String,

    /// Publication cycle; by default only groups in the newest cycle are
    /// mirrored.
    #[serde(default)]
    pub cycle: Option<i64>,
}

/// A folder in the primary file listing, with its path relative to the
/// listing root (the service's root folder prefix already stripped).
#[derive(Debug, Clone)]
pub struct RemoteFolder {
    pub id: i64,
    pub path: String,
}

/// A single remote content item, validated at ingestion.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub id: i64,
    pub name: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    /// Short-lived download URL; must be re-resolved via [`ContentProvider::resolve_item`]
    /// once it goes stale.
    pub url: Option<String>,
    pub content_type: String,
    pub folder_id: Option<i64>,
}

/// Which sub-collection listing to visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// Ordered bundles of item references.
    Bundle,
    /// Pages whose bodies cross-reference files by id.
    Page,
}

/// A sub-collection grouping item references.
#[derive(Debug, Clone)]
pub struct RawCollection {
    pub id: i64,
    pub kind: CollectionKind,
    pub name: String,
    /// Ordering position within the group; bundles only.
    pub position: Option<u32>,
    /// Page body, scanned for file references; pages only.
    pub body: Option<String>,
}

/// Reference to an item that must still be resolved by id.
#[derive(Debug, Clone)]
pub struct ItemRef {
    pub item_id: i64,
    pub title: String,
}

/// Outcome of a listing call. A listing the service does not offer for a
/// given group is not an error; the caller skips that source.
#[derive(Debug)]
pub enum Listing<T> {
    Items(Vec<T>),
    Unsupported,
}

#[cfg_attr(any(test, feature = "test-mocks"), automock)]
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// List every group visible to the configured token.
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>>;

    /// Folders of the primary file listing, used to place files.
    async fn list_folders(&self, group: &RemoteGroup) -> Result<Listing<RemoteFolder>>;

    /// The primary (top-level) file listing.
    async fn list_files(&self, group: &RemoteGroup) -> Result<Listing<RawItem>>;

    /// Sub-collections of the requested kind.
    async fn list_collections(
        &self,
        group: &RemoteGroup,
        kind: CollectionKind,
    ) -> Result<Listing<RawCollection>>;

    /// Item references held by a sub-collection.
    async fn collection_item_refs(
        &self,
        group: &RemoteGroup,
        collection: &RawCollection,
    ) -> Result<Vec<ItemRef>>;

    /// Fetch a single item by id, yielding a fresh download URL.
    async fn resolve_item(&self, group_id: i64, item_id: i64) -> Result<RawItem>;

    /// Stream a download URL to `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}
