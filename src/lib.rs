pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::api::WorkspaceApi;
use crate::config::ExportConfig;
use crate::services::batch::BatchExporter;
use crate::services::credentials::CredentialProvider;
use crate::services::enumerator::TreeEnumerator;
use crate::services::exporter::ExportOrchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collaborators shared by every operation.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn WorkspaceApi>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub config: ExportConfig,
}

impl AppState {
    pub fn enumerator(&self, cancel: CancellationToken) -> TreeEnumerator {
        TreeEnumerator::new(self.api.clone(), self.config.clone(), cancel)
    }

    pub fn orchestrator(&self, cancel: CancellationToken) -> ExportOrchestrator {
        ExportOrchestrator::new(
            self.api.clone(),
            self.credentials.clone(),
            self.config.clone(),
            cancel,
        )
    }

    pub fn batch(&self, cancel: CancellationToken) -> BatchExporter {
        BatchExporter::new(Arc::new(self.orchestrator(cancel)), self.config.clone())
    }
}
