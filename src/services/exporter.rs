use crate::api::{ApiError, ExportRequest, WorkspaceApi};
use crate::config::ExportConfig;
use crate::models::{FileNode, Token};
use crate::services::credentials::CredentialProvider;
use crate::utils::throttle::{guarded, pause};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle of one file's export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Idle,
    ExportRequested,
    Polling { attempt: u32 },
    Resolved,
    Failed,
    TimedOut,
}

/// A finished export job, ready to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExport {
    pub url: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Resolved(ResolvedExport),
    /// Every poll came back without a file. The caller may retry later.
    TimedOut { attempts: u32 },
}

/// Bytes of one exported document.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub token: Token,
    pub name: String,
    pub extension: String,
    pub bytes: Bytes,
}

impl ExportedFile {
    /// Save name: the extension is appended unless the name already has one.
    pub fn file_name(&self) -> String {
        if self.name.contains('.') || self.extension.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.extension)
        }
    }
}

/// Drives one file through export, polling and download. Holds no
/// per-file state, so one instance serves any number of files.
pub struct ExportOrchestrator {
    api: Arc<dyn WorkspaceApi>,
    credentials: Arc<dyn CredentialProvider>,
    config: ExportConfig,
    cancel: CancellationToken,
}

impl ExportOrchestrator {
    pub fn new(
        api: Arc<dyn WorkspaceApi>,
        credentials: Arc<dyn CredentialProvider>,
        config: ExportConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            credentials,
            config,
            cancel,
        }
    }

    fn enter(&self, file: &FileNode, state: ExportState) {
        debug!("{} ({}) -> {:?}", file.id, file.name, state);
    }

    /// Submits the export job and returns its ticket.
    pub async fn request_export(&self, file: &FileNode) -> Result<String, ApiError> {
        let csrf = self
            .credentials
            .get_credential(&self.config.csrf_cookie_name)
            .await
            .ok_or_else(|| ApiError::MissingCredential(self.config.csrf_cookie_name.clone()))?;

        pause(self.config.request_delay, &self.cancel).await?;
        let request = ExportRequest::new(&file.id, file.kind);
        let ticket = guarded(&self.cancel, self.api.create_export(&request, &csrf)).await?;
        self.enter(file, ExportState::ExportRequested);
        Ok(ticket)
    }

    /// Polls the job after the initial delay, at most `max_poll_attempts`
    /// times. Failed polls are logged and count as attempts.
    pub async fn poll(&self, ticket: &str, file: &FileNode) -> Result<PollOutcome, ApiError> {
        pause(self.config.export_initial_delay, &self.cancel).await?;

        let attempts = self.config.max_poll_attempts;
        for attempt in 1..=attempts {
            pause(self.config.poll_interval, &self.cancel).await?;
            self.enter(file, ExportState::Polling { attempt });

            match guarded(&self.cancel, self.api.export_result(ticket, &file.id, file.kind)).await {
                Ok(Some(result)) => {
                    let extension = result
                        .file_extension
                        .unwrap_or_else(|| file.kind.extension().to_string());
                    let url = self.config.download_url(
                        &result.file_token,
                        &file.id,
                        file.kind.export_type(),
                    );
                    self.enter(file, ExportState::Resolved);
                    return Ok(PollOutcome::Resolved(ResolvedExport { url, extension }));
                }
                Ok(None) => debug!("Export {} not ready (attempt {}/{})", ticket, attempt, attempts),
                Err(ApiError::Cancelled) => return Err(ApiError::Cancelled),
                Err(e) => warn!(
                    "Polling export {} failed (attempt {}/{}): {}",
                    ticket, attempt, attempts, e
                ),
            }
        }

        self.enter(file, ExportState::TimedOut);
        Ok(PollOutcome::TimedOut { attempts })
    }

    /// Export request plus polling, without the download.
    pub async fn resolve(&self, file: &FileNode) -> Result<PollOutcome, ApiError> {
        self.enter(file, ExportState::Idle);
        let ticket = self.request_export(file).await?;
        self.poll(&ticket, file).await
    }

    /// Full pipeline for one file. A poll timeout surfaces as `TimedOut`.
    pub async fn export_and_fetch(&self, file: &FileNode) -> Result<ExportedFile, ApiError> {
        let result = self.run(file).await;
        if let Err(e) = &result
            && !e.is_timeout()
        {
            self.enter(file, ExportState::Failed);
        }
        result
    }

    async fn run(&self, file: &FileNode) -> Result<ExportedFile, ApiError> {
        let resolved = match self.resolve(file).await? {
            PollOutcome::Resolved(resolved) => resolved,
            PollOutcome::TimedOut { attempts } => {
                return Err(ApiError::timed_out(format!(
                    "export of {} not ready after {} polls",
                    file.id, attempts
                )));
            }
        };

        pause(self.config.request_delay, &self.cancel).await?;
        let bytes = guarded(&self.cancel, self.api.download(&resolved.url)).await?;
        info!("📦 Fetched {} ({} bytes)", file.name, bytes.len());

        Ok(ExportedFile {
            token: file.id.clone(),
            name: file.name.clone(),
            extension: resolved.extension,
            bytes,
        })
    }
}
