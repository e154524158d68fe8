use crate::config::ExportConfig;
use crate::services::credentials::{CredentialProvider, create_credentials};
use std::sync::Arc;
use tracing::info;

pub fn setup_credentials(config: &ExportConfig) -> Arc<dyn CredentialProvider> {
    info!(
        "🔑 Credentials: environment overrides{}",
        if config.cookie.is_some() { " + session cookie" } else { "" }
    );
    create_credentials(config.cookie.as_deref())
}
