//! HTTP implementation of the content provider.
//!
//! Talks JSON to the remote service with bearer-token auth and page-number
//! pagination. Listing endpoints the service refuses for a group (401/403/404)
//! map to [`Listing::Unsupported`] rather than an error.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{
    CollectionKind, ContentProvider, ItemRef, Listing, RawCollection, RawItem, RemoteFolder,
    RemoteGroup,
};
use crate::config::RemoteConfig;
use crate::utils::{MirrorError, Result};

/// Page size for listing endpoints; a short page terminates pagination.
const PER_PAGE: usize = 100;

/// Name of the service's root folder, stripped from folder paths.
const ROOT_FOLDER: &str = "files";

/// Matches file references embedded in page bodies, e.g. `/files/12345`.
fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/files/(\d+)").expect("reference pattern is valid"))
}

/// Extract referenced file ids from a page body, in order of appearance.
fn page_references(body: &str) -> Vec<i64> {
    reference_pattern()
        .captures_iter(body)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Folder path relative to the listing root, root folder prefix removed.
fn folder_rel_path(full_name: &str) -> String {
    match full_name.strip_prefix(ROOT_FOLDER) {
        Some(rest) => rest.trim_start_matches('/').to_string(),
        None => full_name.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct FolderDto {
    id: i64,
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct FileDto {
    id: i64,
    display_name: Option<String>,
    filename: Option<String>,
    #[serde(default)]
    size: u64,
    modified_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    url: Option<String>,
    content_type: Option<String>,
    folder_id: Option<i64>,
}

impl From<FileDto> for RawItem {
    fn from(dto: FileDto) -> Self {
        let name = dto
            .display_name
            .or(dto.filename)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("file_{}", dto.id));
        RawItem {
            id: dto.id,
            name,
            size: dto.size,
            modified_at: dto.modified_at.or(dto.updated_at),
            url: dto.url,
            content_type: dto.content_type.unwrap_or_default(),
            folder_id: dto.folder_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BundleDto {
    id: i64,
    name: String,
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct BundleItemDto {
    title: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    content_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PageDto {
    id: i64,
    title: String,
    body: Option<String>,
}

/// Content provider backed by the remote service's JSON API.
pub struct HttpProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProvider {
    /// Build a provider from explicit configuration; no global state.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| MirrorError::Config("token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET one page of a listing endpoint; `None` means the listing is not
    /// available for this group.
    async fn get_page<T: DeserializeOwned>(&self, path: &str, page: usize) -> Result<Option<Vec<T>>> {
        let url = format!(
            "{}{}?page={}&per_page={}",
            self.base_url, path, page, PER_PAGE
        );
        let response = self.client.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json().await?)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                debug!("Listing {} not available (status {})", path, response.status());
                Ok(None)
            }
            status => Err(MirrorError::Api {
                status: status.as_u16(),
                url,
            }),
        }
    }

    /// GET a paginated listing, concatenating pages until a short page.
    async fn get_paged<T: DeserializeOwned>(&self, path: &str) -> Result<Listing<T>> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let batch: Vec<T> = match self.get_page(path, page).await? {
                Some(batch) => batch,
                None => return Ok(Listing::Unsupported),
            };
            let short_page = batch.len() < PER_PAGE;
            items.extend(batch);
            if short_page {
                break;
            }
            page += 1;
        }

        Ok(Listing::Items(items))
    }

    /// GET a single object; non-success statuses are errors here.
    async fn get_one<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Api {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ContentProvider for HttpProvider {
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>> {
        match self.get_paged("/api/v1/groups").await? {
            Listing::Items(groups) => Ok(groups),
            // The group index is the service's front door; if it is denied
            // the token is unusable and the run cannot proceed.
            Listing::Unsupported => Err(MirrorError::Api {
                status: StatusCode::FORBIDDEN.as_u16(),
                url: format!("{}/api/v1/groups", self.base_url),
            }),
        }
    }

    async fn list_folders(&self, group: &RemoteGroup) -> Result<Listing<RemoteFolder>> {
        let listing: Listing<FolderDto> = self
            .get_paged(&format!("/api/v1/groups/{}/folders", group.id))
            .await?;
        Ok(match listing {
            Listing::Items(folders) => Listing::Items(
                folders
                    .into_iter()
                    .map(|dto| RemoteFolder {
                        id: dto.id,
                        path: folder_rel_path(&dto.full_name),
                    })
                    .collect(),
            ),
            Listing::Unsupported => Listing::Unsupported,
        })
    }

    async fn list_files(&self, group: &RemoteGroup) -> Result<Listing<RawItem>> {
        let listing: Listing<FileDto> = self
            .get_paged(&format!("/api/v1/groups/{}/files", group.id))
            .await?;
        Ok(match listing {
            Listing::Items(files) => {
                Listing::Items(files.into_iter().map(RawItem::from).collect())
            }
            Listing::Unsupported => Listing::Unsupported,
        })
    }

    async fn list_collections(
        &self,
        group: &RemoteGroup,
        kind: CollectionKind,
    ) -> Result<Listing<RawCollection>> {
        match kind {
            CollectionKind::Bundle => {
                let listing: Listing<BundleDto> = self
                    .get_paged(&format!("/api/v1/groups/{}/bundles", group.id))
                    .await?;
                Ok(match listing {
                    Listing::Items(bundles) => Listing::Items(
                        bundles
                            .into_iter()
                            .map(|dto| RawCollection {
                                id: dto.id,
                                kind,
                                name: dto.name,
                                position: dto.position,
                                body: None,
                            })
                            .collect(),
                    ),
                    Listing::Unsupported => Listing::Unsupported,
                })
            }
            CollectionKind::Page => {
                let listing: Listing<PageDto> = self
                    .get_paged(&format!("/api/v1/groups/{}/pages", group.id))
                    .await?;
                Ok(match listing {
                    Listing::Items(pages) => Listing::Items(
                        pages
                            .into_iter()
                            .map(|dto| RawCollection {
                                id: dto.id,
                                kind,
                                name: dto.title,
                                position: None,
                                body: dto.body,
                            })
                            .collect(),
                    ),
                    Listing::Unsupported => Listing::Unsupported,
                })
            }
        }
    }

    async fn collection_item_refs(
        &self,
        group: &RemoteGroup,
        collection: &RawCollection,
    ) -> Result<Vec<ItemRef>> {
        match collection.kind {
            CollectionKind::Bundle => {
                let listing: Listing<BundleItemDto> = self
                    .get_paged(&format!(
                        "/api/v1/groups/{}/bundles/{}/items",
                        group.id, collection.id
                    ))
                    .await?;
                let items = match listing {
                    Listing::Items(items) => items,
                    Listing::Unsupported => Vec::new(),
                };
                Ok(items
                    .into_iter()
                    .filter(|item| item.kind == "File")
                    .filter_map(|item| {
                        item.content_id.map(|item_id| ItemRef {
                            item_id,
                            title: item.title.unwrap_or_default(),
                        })
                    })
                    .collect())
            }
            CollectionKind::Page => {
                let body = collection.body.as_deref().unwrap_or("");
                Ok(page_references(body)
                    .into_iter()
                    .map(|item_id| ItemRef {
                        item_id,
                        title: collection.name.clone(),
                    })
                    .collect())
            }
        }
    }

    async fn resolve_item(&self, group_id: i64, item_id: i64) -> Result<RawItem> {
        let dto: FileDto = self
            .get_one(&format!("/api/v1/groups/{}/files/{}", group_id, item_id))
            .await?;
        Ok(dto.into())
    }

    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Api {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_references_in_order() {
        let body = r#"<p>See <a href="/files/101/download">slides</a> and
            <a href="https://content.example.edu/groups/7/files/202">notes</a>.</p>"#;
        assert_eq!(page_references(body), vec![101, 202]);
    }

    #[test]
    fn test_page_references_empty_body() {
        assert_eq!(page_references(""), Vec::<i64>::new());
        assert_eq!(page_references("<p>no attachments</p>"), Vec::<i64>::new());
    }

    #[test]
    fn test_folder_rel_path_strips_root() {
        assert_eq!(folder_rel_path("files"), "");
        assert_eq!(folder_rel_path("files/Week 1"), "Week 1");
        assert_eq!(folder_rel_path("Other/Week 1"), "Other/Week 1");
    }

    #[test]
    fn test_file_dto_name_fallbacks() {
        let dto = FileDto {
            id: 9,
            display_name: None,
            filename: Some("syllabus.pdf".into()),
            size: 10,
            modified_at: None,
            updated_at: None,
            url: None,
            content_type: None,
            folder_id: None,
        };
        assert_eq!(RawItem::from(dto).name, "syllabus.pdf");

        let dto = FileDto {
            id: 9,
            display_name: None,
            filename: None,
            size: 0,
            modified_at: None,
            updated_at: None,
            url: None,
            content_type: None,
            folder_id: None,
        };
        assert_eq!(RawItem::from(dto).name, "file_9");
    }

    #[test]
    fn test_file_dto_prefers_modified_at() {
        let modified = "2024-03-01T10:00:00Z".parse().unwrap();
        let updated = "2024-04-01T10:00:00Z".parse().unwrap();
        let dto = FileDto {
            id: 1,
            display_name: Some("a.txt".into()),
            filename: None,
            size: 1,
            modified_at: Some(modified),
            updated_at: Some(updated),
            url: None,
            content_type: None,
            folder_id: None,
        };
        assert_eq!(RawItem::from(dto).modified_at, Some(modified));
    }
}
