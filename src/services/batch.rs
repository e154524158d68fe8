use crate::api::ApiError;
use crate::config::ExportConfig;
use crate::models::{FileNode, Forest, Token};
use crate::services::exporter::{ExportOrchestrator, ExportedFile};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of one selected file.
#[derive(Debug)]
pub struct FileReport {
    pub token: Token,
    /// Empty when the token was not found in the forest
    pub name: String,
    /// Root label and folder names leading to the file
    pub folders: Vec<String>,
    pub result: Result<ExportedFile, ApiError>,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Captured failure reason, if any
    pub fn reason(&self) -> Option<String> {
        self.result.as_ref().err().map(|e| e.to_string())
    }
}

/// Per-file outcomes of a batch, in selection order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&FileReport, &ExportedFile)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().ok().map(|exported| (f, exported)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FileReport, &ApiError)> {
        self.files
            .iter()
            .filter_map(|f| f.result.as_ref().err().map(|e| (f, e)))
    }
}

/// Exports a selection through a bounded pool; one file failing never
/// affects the others.
pub struct BatchExporter {
    orchestrator: Arc<ExportOrchestrator>,
    config: ExportConfig,
}

impl BatchExporter {
    pub fn new(orchestrator: Arc<ExportOrchestrator>, config: ExportConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    pub async fn export(&self, forest: &Forest, selection: &[Token]) -> BatchReport {
        let concurrency = self.config.max_concurrent_exports.max(1);
        info!(
            "🚚 Exporting {} file(s), {} at a time",
            selection.len(),
            concurrency
        );

        let files = stream::iter(forest.select(selection))
            .map(|selected| async move {
                match selected {
                    Ok(file) => self.export_one(forest, file).await,
                    Err(token) => {
                        error!("❌ {} is not in the enumerated tree", token);
                        FileReport {
                            result: Err(ApiError::NotFound(token.clone())),
                            token,
                            name: String::new(),
                            folders: Vec::new(),
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = BatchReport { files };
        info!(
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        report
    }

    async fn export_one(&self, forest: &Forest, file: &FileNode) -> FileReport {
        let ceiling = self.config.file_timeout;
        let result =
            match tokio::time::timeout(ceiling, self.orchestrator.export_and_fetch(file)).await {
                Ok(result) => result,
                Err(_) => Err(ApiError::timed_out(format!(
                    "{} exceeded the {}s per-file limit",
                    file.id,
                    ceiling.as_secs()
                ))),
            };

        if let Err(e) = &result {
            error!("❌ {} ({}): {}", file.name, file.id, e);
        }

        FileReport {
            token: file.id.clone(),
            name: file.name.clone(),
            folders: forest.folder_trail(&file.id).unwrap_or_default(),
            result,
        }
    }
}
