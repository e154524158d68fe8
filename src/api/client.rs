use super::types::{
    Envelope, ExportRequest, ExportResult, ExportResultData, ExportTicketData, ListingData,
    NodeListing,
};
use super::{ApiError, WorkspaceApi};
use crate::config::ExportConfig;
use crate::models::DocumentKind;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, REFERER};
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

/// `WorkspaceApi` over HTTP, authenticated by the ambient session cookie.
pub struct HttpWorkspaceApi {
    http: reqwest::Client,
    base_url: Url,
    config: ExportConfig,
}

impl HttpWorkspaceApi {
    pub fn new(config: ExportConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::protocol(format!("invalid base URL {}: {}", config.base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        if let Ok(referer) = HeaderValue::from_str(base_url.as_str()) {
            headers.insert(REFERER, referer);
        }
        if let Some(cookie) = &config.cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ApiError::protocol(format!("invalid cookie header: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::protocol(format!("invalid endpoint {}: {}", path, e)))
    }

    fn listing_url(
        &self,
        path: &str,
        params: &[(&str, String)],
        cursor: Option<&str>,
    ) -> Result<Url, ApiError> {
        let mut url = self.endpoint(path)?;
        if !params.is_empty() || cursor.is_some() {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            if let Some(cursor) = cursor {
                query.append_pair("last_label", cursor);
            }
        }
        Ok(url)
    }

    async fn get_envelope<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!("GET {}", url);
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(status));
        }
        let body = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&body)?;
        envelope.into_data()
    }

    async fn get_listing(&self, url: Url) -> Result<NodeListing, ApiError> {
        let data: ListingData = self.get_envelope(url).await?;
        Ok(NodeListing::from(data))
    }

    fn page_size(&self) -> String {
        self.config.page_size.to_string()
    }
}

#[async_trait]
impl WorkspaceApi for HttpWorkspaceApi {
    async fn list_children(
        &self,
        folder_token: &str,
        cursor: Option<&str>,
    ) -> Result<NodeListing, ApiError> {
        let url = self.listing_url(
            &self.config.endpoints.children_list,
            &[
                ("asc", "1".to_string()),
                ("rank", "5".to_string()),
                ("token", folder_token.to_string()),
                ("length", self.page_size()),
            ],
            cursor,
        )?;
        self.get_listing(url).await
    }

    async fn list_personal_root(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        let url = self.listing_url(&self.config.endpoints.personal_root, &[], cursor)?;
        self.get_listing(url).await
    }

    async fn list_personal_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        let url = self.listing_url(
            &self.config.endpoints.personal_folders,
            &[
                ("asc", "1".to_string()),
                ("rank", "5".to_string()),
                ("length", self.page_size()),
            ],
            cursor,
        )?;
        self.get_listing(url).await
    }

    async fn list_shared_folders(&self, cursor: Option<&str>) -> Result<NodeListing, ApiError> {
        let url = self.listing_url(
            &self.config.endpoints.shared_folders,
            &[
                ("asc", "0".to_string()),
                ("rank", "3".to_string()),
                ("hidden", "0".to_string()),
                ("length", self.page_size()),
            ],
            cursor,
        )?;
        self.get_listing(url).await
    }

    async fn create_export(
        &self,
        request: &ExportRequest,
        csrf_token: &str,
    ) -> Result<String, ApiError> {
        let mut url = self.endpoint(&self.config.endpoints.export_create)?;
        url.query_pairs_mut()
            .append_pair("synced_block_host_token", &request.token)
            .append_pair("synced_block_host_type", &request.export_type);

        let request_id = Uuid::new_v4().simple().to_string();
        tracing::debug!("POST {} (request-id {})", url, request_id);

        let response = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header("x-csrftoken", csrf_token)
            .header("x-request-id", &request_id)
            .header("request-id", &request_id)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(status));
        }
        let body = response.bytes().await?;
        let envelope: Envelope<ExportTicketData> = serde_json::from_slice(&body)?;
        envelope
            .into_data()?
            .ticket
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::protocol("export creation returned no ticket"))
    }

    async fn export_result(
        &self,
        ticket: &str,
        doc_token: &str,
        kind: DocumentKind,
    ) -> Result<Option<ExportResult>, ApiError> {
        let mut url = self.endpoint(&format!(
            "{}{}",
            self.config.endpoints.export_result, ticket
        ))?;
        url.query_pairs_mut()
            .append_pair("token", doc_token)
            .append_pair("type", kind.export_type())
            .append_pair("synced_block_host_token", doc_token)
            .append_pair("synced_block_host_type", kind.export_type());

        let data: ExportResultData = self.get_envelope(url).await?;
        Ok(data.into_result())
    }

    async fn download(&self, url: &str) -> Result<Bytes, ApiError> {
        tracing::debug!("GET {} (binary)", url);
        // Large exports stream for longer than one API call; only the
        // per-file ceiling applies here.
        let response = self
            .http
            .get(url)
            .timeout(self.config.file_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::status(status));
        }

        let mut buffer = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        tracing::debug!("Downloaded {} bytes", buffer.len());
        Ok(buffer.freeze())
    }
}
