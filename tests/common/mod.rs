#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use space_exporter::api::{
    ApiError, ExportRequest, ExportResult, NodeListing, RemoteEntry, WorkspaceApi,
};
use space_exporter::config::ExportConfig;
use space_exporter::models::DocumentKind;
use space_exporter::services::credentials::CredentialProvider;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// How the mock answers export calls for one document token.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportBehavior {
    /// Ready on the given poll attempt (1-based), with an optional extension
    ReadyOn { attempt: u32, extension: Option<String> },
    /// Never ready
    NeverReady,
    /// Export creation answers HTTP 500
    CreateFails,
    /// Ready on the first poll, download answers HTTP 500
    DownloadFails,
    /// Polls fail with a network error until the given attempt, then ready
    PollErrorsUntil(u32),
}

/// Scripted in-memory workspace.
#[derive(Default)]
pub struct MockWorkspaceApi {
    personal_root: Vec<Vec<RemoteEntry>>,
    personal_folders: Vec<Vec<RemoteEntry>>,
    shared_folders: Vec<Vec<RemoteEntry>>,
    children: HashMap<String, Vec<Vec<RemoteEntry>>>,
    failing: HashSet<String>,
    exports: HashMap<String, ExportBehavior>,
    download_delay: Duration,

    pub listing_calls: Mutex<Vec<String>>,
    pub create_calls: Mutex<Vec<(ExportRequest, String)>>,
    pub poll_times: Mutex<Vec<Instant>>,
    polls_per_ticket: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockWorkspaceApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_personal_root(mut self, entries: Vec<RemoteEntry>) -> Self {
        self.personal_root = vec![entries];
        self
    }

    pub fn with_personal_folders(mut self, entries: Vec<RemoteEntry>) -> Self {
        self.personal_folders = vec![entries];
        self
    }

    pub fn with_shared_folders(mut self, entries: Vec<RemoteEntry>) -> Self {
        self.shared_folders = vec![entries];
        self
    }

    pub fn with_shared_folder_pages(mut self, pages: Vec<Vec<RemoteEntry>>) -> Self {
        self.shared_folders = pages;
        self
    }

    pub fn with_children(self, folder: &str, entries: Vec<RemoteEntry>) -> Self {
        self.with_children_pages(folder, vec![entries])
    }

    pub fn with_children_pages(mut self, folder: &str, pages: Vec<Vec<RemoteEntry>>) -> Self {
        self.children.insert(folder.to_string(), pages);
        self
    }

    /// Makes a listing fail: `personal_root`, `personal_folders`,
    /// `shared_folders` or a folder token.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    pub fn with_export(mut self, token: &str, behavior: ExportBehavior) -> Self {
        self.exports.insert(token.to_string(), behavior);
        self
    }

    pub fn with_download_delay(mut self, delay: Duration) -> Self {
        self.download_delay = delay;
        self
    }

    pub fn listing_count(&self, key: &str) -> usize {
        self.listing_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }

    pub fn poll_count(&self) -> usize {
        self.poll_times.lock().unwrap().len()
    }

    fn page(
        &self,
        key: &str,
        pages: &[Vec<RemoteEntry>],
        cursor: Option<&str>,
    ) -> Result<NodeListing, ApiError> {
        self.listing_calls.lock().unwrap().push(key.to_string());
        if self.failing.contains(key) {
            return Err(ApiError::Network {
                status: Some(500),
                reason: format!("HTTP 500 listing {}", key),
            });
        }

        let index = cursor
            .and_then(|c| c.strip_prefix("page-"))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        let entries = pages.get(index).cloned().unwrap_or_default();
        let has_more = index + 1 < pages.len();
        Ok(NodeListing {
            entries,
            has_more,
            last_label: has_more.then(|| format!("page-{}", index + 1)),
        })
    }

    fn behavior(&self, token: &str) -> ExportBehavior {
        self.exports
            .get(token)
            .cloned()
            .unwrap_or(ExportBehavior::ReadyOn {
                attempt: 1,
                extension: None,
            })
    }
}

#[async_trait]
impl WorkspaceApi for MockWorkspaceApi {
    async fn list_children(
        &self,
        folder_token: &str,
        cursor: Option<&str>,
    ) -> Result<NodeListing, ApiError> {
        let pages = self.children.get(folder_token).cloned().unwrap_or_default();
        self.page(folder_token, &pages, cursor)
    }

    async fn list_personal_root(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        self.page("personal_root", &self.personal_root, cursor)
    }

    async fn list_personal_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        self.page("personal_folders", &self.personal_folders, cursor)
    }

    async fn list_shared_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        self.page("shared_folders", &self.shared_folders, cursor)
    }

    async fn create_export(
        &self,
        request: &ExportRequest,
        csrf_token: &str,
    ) -> Result<String, ApiError> {
        self.create_calls
            .lock()
            .unwrap()
            .push((request.clone(), csrf_token.to_string()));
        if self.behavior(&request.token) == ExportBehavior::CreateFails {
            return Err(ApiError::status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(format!("ticket-{}", request.token))
    }

    async fn export_result(
        &self,
        ticket: &str,
        doc_token: &str,
        _kind: DocumentKind,
    ) -> Result<Option<ExportResult>, ApiError> {
        self.poll_times.lock().unwrap().push(Instant::now());
        let attempt = {
            let mut polls = self.polls_per_ticket.lock().unwrap();
            let n = polls.entry(ticket.to_string()).or_insert(0);
            *n += 1;
            *n
        };

        let ready = |extension: Option<String>| -> Result<Option<ExportResult>, ApiError> {
            Ok(Some(ExportResult {
                file_token: format!("box-{}", doc_token),
                file_extension: extension,
            }))
        };

        match self.behavior(doc_token) {
            ExportBehavior::ReadyOn {
                attempt: at,
                extension,
            } if attempt >= at => ready(extension),
            ExportBehavior::ReadyOn { .. } | ExportBehavior::NeverReady => Ok(None),
            ExportBehavior::CreateFails => Err(ApiError::protocol("no such ticket")),
            ExportBehavior::DownloadFails => ready(None),
            ExportBehavior::PollErrorsUntil(at) if attempt < at => Err(ApiError::Network {
                status: None,
                reason: "connection reset".to_string(),
            }),
            ExportBehavior::PollErrorsUntil(_) => ready(None),
        }
    }

    async fn download(&self, url: &str) -> Result<Bytes, ApiError> {
        let doc_token = url
            .split("/all/box-")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .ok_or_else(|| ApiError::protocol(format!("unexpected download URL {}", url)))?
            .to_string();

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.download_delay.is_zero() {
            tokio::time::sleep(self.download_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.behavior(&doc_token) == ExportBehavior::DownloadFails {
            return Err(ApiError::status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(Bytes::from(format!("content-of-{}", doc_token)))
    }
}

/// Credential provider answering one fixed CSRF token, counting lookups.
pub struct StaticCredentials {
    csrf: Option<String>,
    pub lookups: AtomicUsize,
}

impl StaticCredentials {
    pub fn new(csrf: Option<&str>) -> Self {
        Self {
            csrf: csrf.map(str::to_string),
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn get_credential(&self, name: &str) -> Option<String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if name == "_csrf_token" {
            self.csrf.clone()
        } else {
            None
        }
    }
}

pub fn folder(token: &str, name: &str) -> RemoteEntry {
    RemoteEntry::folder(token, name)
}

pub fn doc(token: &str, name: &str, kind: DocumentKind) -> RemoteEntry {
    RemoteEntry::document(token, name, kind.code())
}

/// Test config: no throttling, reference polling timings.
pub fn test_config() -> ExportConfig {
    ExportConfig::testing()
}
