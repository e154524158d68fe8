use crate::api::{ApiError, NodeListing, RemoteEntry, WorkspaceApi};
use crate::config::ExportConfig;
use crate::models::{
    FileNode, FolderNode, Forest, Namespace, Node, PERSONAL_ROOT_ID, SHARED_ROOT_ID, Token,
};
use crate::services::reconciler::reconcile;
use crate::utils::throttle::{guarded, pause};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A listing that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingFailure {
    /// `None` for a namespace's first-level listing
    pub folder_id: Option<Token>,
    pub path: String,
    pub reason: String,
}

/// Result of one `list_folder` call: the files directly inside the folder
/// and its sub-folders, each carrying its own subtree as `children`.
#[derive(Debug, Default)]
pub struct FolderListing {
    pub files: Vec<FileNode>,
    pub folders: Vec<FolderNode>,
    pub failures: Vec<ListingFailure>,
    pub cancelled: bool,
}

impl FolderListing {
    fn absorb(&mut self, other: FolderListing) {
        self.files.extend(other.files);
        self.folders.extend(other.folders);
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }

    fn record(&mut self, error: ApiError, folder_id: Option<&str>, path: &str) {
        if error.is_cancelled() {
            self.cancelled = true;
            return;
        }
        warn!("⚠️  Listing {} failed, skipping branch: {}", path, error);
        self.failures.push(ListingFailure {
            folder_id: folder_id.map(str::to_string),
            path: path.to_string(),
            reason: error.to_string(),
        });
    }

    fn truncated(&mut self, folder_id: Option<&str>, path: &str, pages: u32) {
        warn!("⚠️  Listing {} still has more entries after {} page(s)", path, pages);
        self.failures.push(ListingFailure {
            folder_id: folder_id.map(str::to_string),
            path: path.to_string(),
            reason: format!("truncated after {} page(s)", pages),
        });
    }

    /// Pulls every nested node out into flat `(files, folders)` lists.
    /// Folders come out with empty `children`, parents before descendants.
    pub fn into_flat(self) -> (Vec<FileNode>, Vec<FolderNode>) {
        let mut files = self.files;
        let mut folders = Vec::new();
        for folder in self.folders {
            flatten_into(folder, &mut files, &mut folders);
        }
        (files, folders)
    }
}

fn flatten_into(mut folder: FolderNode, files: &mut Vec<FileNode>, folders: &mut Vec<FolderNode>) {
    let children = std::mem::take(&mut folder.children);
    folders.push(folder);
    for child in children {
        match child {
            Node::File(file) => files.push(file),
            Node::Folder(sub) => flatten_into(sub, files, folders),
        }
    }
}

/// Outcome of a whole-workspace enumeration.
#[derive(Debug, Clone)]
pub struct EnumerationReport {
    pub forest: Forest,
    pub failures: Vec<ListingFailure>,
    pub cancelled: bool,
}

impl EnumerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// `PartialEnumeration` when any listing was skipped.
    pub fn partial_error(&self) -> Option<ApiError> {
        if self.failures.is_empty() {
            None
        } else {
            Some(ApiError::PartialEnumeration {
                failed: self.failures.len(),
            })
        }
    }
}

/// Entries of every fetched page. `truncated` when the page cap was hit
/// while the listing still had more.
struct Pages {
    entries: Vec<RemoteEntry>,
    truncated: bool,
}

#[derive(Debug, Clone, Copy)]
enum ListingSource<'a> {
    Children(&'a str),
    PersonalRoot,
    PersonalFolders,
    SharedFolders,
}

/// Walks both namespaces sequentially and reconciles them into a forest.
pub struct TreeEnumerator {
    api: Arc<dyn WorkspaceApi>,
    config: ExportConfig,
    cancel: CancellationToken,
}

impl TreeEnumerator {
    pub fn new(api: Arc<dyn WorkspaceApi>, config: ExportConfig, cancel: CancellationToken) -> Self {
        Self {
            api,
            config,
            cancel,
        }
    }

    /// Best-effort enumeration: failed listings are reported, never raised.
    pub async fn enumerate(&self) -> EnumerationReport {
        info!("🔎 Enumerating workspace...");

        let mut collected = self.enumerate_personal().await;
        if !collected.cancelled {
            collected.absorb(self.enumerate_shared().await);
        }

        let failures = std::mem::take(&mut collected.failures);
        let cancelled = collected.cancelled;
        let (files, folders) = collected.into_flat();
        debug!(
            "Collected {} file(s) and {} folder(s) before reconciliation",
            files.len(),
            folders.len()
        );

        let forest = reconcile(files, folders, &self.config.labels);
        info!(
            "✅ Enumeration finished: {} file(s), {} folder(s), {} failed listing(s){}",
            forest.file_count(),
            forest.folder_count(),
            failures.len(),
            if cancelled { ", cancelled" } else { "" }
        );

        EnumerationReport {
            forest,
            failures,
            cancelled,
        }
    }

    /// Lists one folder and everything below it. `None` lists the root of
    /// the namespace `path` belongs to.
    pub async fn list_folder(
        &self,
        folder_id: Option<&str>,
        path: &str,
        parent_id: &str,
    ) -> FolderListing {
        self.walk(folder_id, path, parent_id, &[]).await
    }

    /// `ancestors` holds the folder tokens on the way down to this folder.
    #[async_recursion::async_recursion]
    async fn walk(
        &self,
        folder_id: Option<&str>,
        path: &str,
        parent_id: &str,
        ancestors: &[Token],
    ) -> FolderListing {
        let source = match folder_id {
            Some(id) => ListingSource::Children(id),
            None => match self.config.labels.namespace_of_path(path) {
                Namespace::Personal => ListingSource::PersonalRoot,
                Namespace::Shared => ListingSource::SharedFolders,
            },
        };

        let mut chain = ancestors.to_vec();
        if let Some(id) = folder_id {
            chain.push(id.to_string());
        }

        match self.fetch_pages(source).await {
            Ok(pages) => {
                let mut out = self.expand(pages.entries, path, parent_id, &chain).await;
                if pages.truncated {
                    out.truncated(folder_id, path, self.config.max_pages);
                }
                out
            }
            Err(e) => {
                let mut out = FolderListing::default();
                out.record(e, folder_id, path);
                out
            }
        }
    }

    async fn enumerate_personal(&self) -> FolderListing {
        let root_path = self.config.labels.personal.clone();
        let mut out = FolderListing::default();

        if let Err(e) = pause(self.config.namespace_delay, &self.cancel).await {
            out.record(e, None, &root_path);
            return out;
        }

        // Folder index first; the root object listing only contributes files,
        // its folders are already covered here.
        match self.fetch_pages(ListingSource::PersonalFolders).await {
            Ok(pages) => {
                if pages.truncated {
                    out.truncated(None, &root_path, self.config.max_pages);
                }
                let folders = pages.entries.into_iter().filter(RemoteEntry::is_folder).collect();
                out.absorb(self.expand(folders, &root_path, PERSONAL_ROOT_ID, &[]).await);
            }
            Err(e) => out.record(e, None, &root_path),
        }
        if out.cancelled {
            return out;
        }

        match self.fetch_pages(ListingSource::PersonalRoot).await {
            Ok(pages) => {
                if pages.truncated {
                    out.truncated(None, &root_path, self.config.max_pages);
                }
                let files = pages.entries.into_iter().filter(|e| !e.is_folder()).collect();
                out.absorb(self.expand(files, &root_path, PERSONAL_ROOT_ID, &[]).await);
            }
            Err(e) => out.record(e, None, &root_path),
        }
        out
    }

    async fn enumerate_shared(&self) -> FolderListing {
        let root_path = self.config.labels.shared.clone();
        let mut out = FolderListing::default();

        if let Err(e) = pause(self.config.namespace_delay, &self.cancel).await {
            out.record(e, None, &root_path);
            return out;
        }

        match self.fetch_pages(ListingSource::SharedFolders).await {
            Ok(pages) => {
                if pages.truncated {
                    out.truncated(None, &root_path, self.config.max_pages);
                }
                let (folders, stray): (Vec<_>, Vec<_>) =
                    pages.entries.into_iter().partition(RemoteEntry::is_folder);
                if !stray.is_empty() {
                    debug!("Ignoring {} non-folder entries in shared folder list", stray.len());
                }
                out.absorb(self.expand(folders, &root_path, SHARED_ROOT_ID, &[]).await);
            }
            Err(e) => out.record(e, None, &root_path),
        }
        out
    }

    /// Turns listing entries into nodes, descending into every folder that
    /// is not already one of `ancestors`.
    async fn expand(
        &self,
        entries: Vec<RemoteEntry>,
        path: &str,
        parent_id: &str,
        ancestors: &[Token],
    ) -> FolderListing {
        let origin = self.config.labels.namespace_of_path(path);
        let mut out = FolderListing::default();

        for entry in entries {
            if entry.is_folder() {
                let child_path = format!("{}/{}", path, entry.name);
                if ancestors.contains(&entry.token) {
                    warn!(
                        "⚠️  Folder {} at {} is its own ancestor, not descending",
                        entry.token, child_path
                    );
                    continue;
                }

                let sub = self
                    .walk(Some(&entry.token), &child_path, &entry.token, ancestors)
                    .await;
                let mut folder = FolderNode::new(&entry.token, &entry.name, &child_path, parent_id);
                folder
                    .children
                    .extend(sub.folders.into_iter().map(Node::Folder));
                folder.children.extend(sub.files.into_iter().map(Node::File));
                out.folders.push(folder);
                out.failures.extend(sub.failures);
                if sub.cancelled {
                    out.cancelled = true;
                    break;
                }
            } else {
                debug!("Found {:?} document {} in {}", entry.kind(), entry.token, path);
                out.files.push(FileNode {
                    kind: entry.kind(),
                    id: entry.token,
                    name: entry.name,
                    remote_url: entry.url,
                    path: path.to_string(),
                    parent_id: parent_id.to_string(),
                    origin,
                });
            }
        }
        out
    }

    /// Follows the `last_label` cursor up to `max_pages` pages, throttling
    /// before every request.
    async fn fetch_pages(&self, source: ListingSource<'_>) -> Result<Pages, ApiError> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..self.config.max_pages.max(1) {
            pause(self.config.request_delay, &self.cancel).await?;
            let listing = guarded(&self.cancel, self.fetch_page(source, cursor.as_deref())).await?;

            let next = listing.next_cursor().map(str::to_string);
            debug!("{:?} page {}: {} entries", source, page + 1, listing.entries.len());
            entries.extend(listing.entries);

            match next {
                Some(label) => cursor = Some(label),
                None => {
                    return Ok(Pages {
                        entries,
                        truncated: false,
                    });
                }
            }
        }

        Ok(Pages {
            entries,
            truncated: true,
        })
    }

    async fn fetch_page(
        &self,
        source: ListingSource<'_>,
        cursor: Option<&str>,
    ) -> Result<NodeListing, ApiError> {
        match source {
            ListingSource::Children(id) => self.api.list_children(id, cursor).await,
            ListingSource::PersonalRoot => self.api.list_personal_root(cursor).await,
            ListingSource::PersonalFolders => self.api.list_personal_folders(cursor).await,
            ListingSource::SharedFolders => self.api.list_shared_folders(cursor).await,
        }
    }
}
