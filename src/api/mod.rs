use async_trait::async_trait;
use bytes::Bytes;

use crate::models::DocumentKind;

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpWorkspaceApi;
pub use error::ApiError;
pub use types::{ExportRequest, ExportResult, NodeListing, RemoteEntry};

/// Stateless request surface of the remote workspace. No call retries;
/// retry policy belongs to the callers.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Children of one folder, ascending, one page per call
    async fn list_children(
        &self,
        folder_token: &str,
        cursor: Option<&str>,
    ) -> Result<NodeListing, ApiError>;

    /// Objects sitting directly in the personal root
    async fn list_personal_root(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError>;

    /// First-level personal folders
    async fn list_personal_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError>;

    /// First-level shared folders
    async fn list_shared_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError>;

    /// Submit an export job and return its ticket
    async fn create_export(
        &self,
        request: &ExportRequest,
        csrf_token: &str,
    ) -> Result<String, ApiError>;

    /// Job status by ticket. `None` while the export is still running.
    async fn export_result(
        &self,
        ticket: &str,
        doc_token: &str,
        kind: DocumentKind,
    ) -> Result<Option<ExportResult>, ApiError>;

    /// Fetch the bytes behind a resolved download URL
    async fn download(&self, url: &str) -> Result<Bytes, ApiError>;
}
