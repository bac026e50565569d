//! Aggregation of one remote snapshot per group across all content sources.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::fs::sanitize::{sanitize, sanitize_rel_path};
use crate::provider::{CollectionKind, ContentProvider, Listing, RawCollection, RemoteGroup};
use crate::sync::record::{ContentRecord, Snapshot};
use crate::utils::Result;

/// Provenance label for the primary file listing.
const SOURCE_FILES: &str = "files";

/// Builds the remote-side snapshot for one group.
///
/// Sources are visited in fixed precedence order: the primary file listing,
/// then bundles, then pages. A later source wins path collisions. A source
/// that fails or is unsupported contributes zero items, and a single item
/// that fails to resolve is skipped; neither aborts the group.
pub struct RemoteSnapshotBuilder<'a, P: ContentProvider> {
    provider: &'a P,
}

impl<'a, P: ContentProvider> RemoteSnapshotBuilder<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    pub async fn build(&self, group: &RemoteGroup) -> Snapshot {
        let mut snapshot = Snapshot::new();

        self.collect_files(group, &mut snapshot).await;
        self.collect_collections(group, CollectionKind::Bundle, &mut snapshot)
            .await;
        self.collect_collections(group, CollectionKind::Page, &mut snapshot)
            .await;

        info!("Found {} files in group {}", snapshot.len(), group.name);
        snapshot
    }

    /// The primary file listing, placed by folder.
    async fn collect_files(&self, group: &RemoteGroup, snapshot: &mut Snapshot) {
        let folders: HashMap<i64, String> = match self.provider.list_folders(group).await {
            Ok(Listing::Items(folders)) => folders
                .into_iter()
                .map(|folder| (folder.id, sanitize_rel_path(&folder.path)))
                .collect(),
            Ok(Listing::Unsupported) => HashMap::new(),
            Err(e) => {
                warn!("Failed to list folders for group {}: {}", group.name, e);
                HashMap::new()
            }
        };

        let files = match self.provider.list_files(group).await {
            Ok(Listing::Items(files)) => files,
            Ok(Listing::Unsupported) => {
                debug!("File listing not available for group {}", group.name);
                return;
            }
            Err(e) => {
                warn!("Failed to list files for group {}: {}", group.name, e);
                return;
            }
        };

        for item in files {
            let parent = item
                .folder_id
                .and_then(|id| folders.get(&id).cloned())
                .unwrap_or_default();
            let record = ContentRecord::from_item(&item, &parent, SOURCE_FILES.to_string());
            snapshot.insert(record.path.clone(), record);
        }
    }

    /// One kind of sub-collection listing (bundles or pages).
    async fn collect_collections(
        &self,
        group: &RemoteGroup,
        kind: CollectionKind,
        snapshot: &mut Snapshot,
    ) {
        let label = match kind {
            CollectionKind::Bundle => "bundles",
            CollectionKind::Page => "pages",
        };

        let collections = match self.provider.list_collections(group, kind).await {
            Ok(Listing::Items(collections)) => collections,
            Ok(Listing::Unsupported) => {
                debug!("{} listing not available for group {}", label, group.name);
                return;
            }
            Err(e) => {
                warn!("Failed to list {} for group {}: {}", label, group.name, e);
                return;
            }
        };
        info!("Found {} {} in group {}", collections.len(), label, group.name);

        for (index, collection) in collections.iter().enumerate() {
            if let Err(e) = self.collect_one(group, collection, index, snapshot).await {
                warn!(
                    "Failed to process {} {} in group {}: {}",
                    label, collection.name, group.name, e
                );
            }
        }
    }

    /// Resolve every item reference of one collection into the snapshot.
    async fn collect_one(
        &self,
        group: &RemoteGroup,
        collection: &RawCollection,
        index: usize,
        snapshot: &mut Snapshot,
    ) -> Result<()> {
        let parent = collection_folder(collection, index);
        let source = match collection.kind {
            CollectionKind::Bundle => format!("bundle:{}", collection.id),
            CollectionKind::Page => format!("page:{}", collection.id),
        };

        let refs = self.provider.collection_item_refs(group, collection).await?;
        for item_ref in refs {
            match self.provider.resolve_item(group.id, item_ref.item_id).await {
                Ok(item) => {
                    let record = ContentRecord::from_item(&item, &parent, source.clone());
                    snapshot.insert(record.path.clone(), record);
                }
                Err(e) => {
                    warn!(
                        "Skipping item {} ({}) in group {}: {}",
                        item_ref.item_id, item_ref.title, group.name, e
                    );
                }
            }
        }
        Ok(())
    }
}

/// Relative directory receiving a collection's items. Bundles keep their
/// listing order in the directory name; pages are keyed by title.
fn collection_folder(collection: &RawCollection, index: usize) -> String {
    match collection.kind {
        CollectionKind::Bundle => {
            let position = collection.position.unwrap_or(index as u32 + 1);
            format!("bundles/{}_{}", position, sanitize(&collection.name))
        }
        CollectionKind::Page => {
            let mut name = sanitize(&collection.name);
            if name.is_empty() {
                name = format!("page_{}", collection.id);
            }
            format!("pages/{}", name)
        }
    }
}
