use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {reason}")]
    Network { status: Option<u16>, reason: String },

    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    #[error("Timed out: {reason}")]
    TimedOut { reason: String },

    #[error("Partial enumeration: {failed} listing(s) failed")]
    PartialEnumeration { failed: usize },

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Archive error: {0}")]
    Archive(String),
}

impl ApiError {
    pub fn status(status: reqwest::StatusCode) -> Self {
        ApiError::Network {
            status: Some(status.as_u16()),
            reason: format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status")
            ),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        ApiError::Protocol {
            reason: reason.into(),
        }
    }

    pub fn timed_out(reason: impl Into<String>) -> Self {
        ApiError::TimedOut {
            reason: reason.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return ApiError::protocol(format!("malformed response body: {}", e));
        }
        ApiError::Network {
            status: e.status().map(|s| s.as_u16()),
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::protocol(format!("malformed JSON: {}", e))
    }
}

impl From<zip::result::ZipError> for ApiError {
    fn from(e: zip::result::ZipError) -> Self {
        ApiError::Archive(e.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Archive(e.to_string())
    }
}
