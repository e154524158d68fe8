use crate::api::{HttpWorkspaceApi, WorkspaceApi};
use crate::config::ExportConfig;
use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};

pub fn setup_client(config: &ExportConfig) -> anyhow::Result<Arc<dyn WorkspaceApi>> {
    info!("🌐 Workspace: {} (downloads via {})", config.base_url, config.stream_base_url);
    if config.cookie.is_none() {
        warn!("SPACE_COOKIE is not set, requests will be unauthenticated");
    }

    let client = HttpWorkspaceApi::new(config.clone()).context("failed to build HTTP client")?;
    Ok(Arc::new(client))
}
