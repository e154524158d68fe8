use crate::models::RootLabels;
use std::env;
use std::time::Duration;

/// Paths of the workspace endpoints, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub children_list: String,
    pub personal_root: String,
    pub personal_folders: String,
    pub shared_folders: String,
    pub export_create: String,
    /// The ticket is appended to this prefix.
    pub export_result: String,
    /// Relative to `stream_base_url`. Placeholders: `{file_token}`, `{token}`, `{type}`.
    pub download_template: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            children_list: "/space/api/explorer/v3/children/list/".to_string(),
            personal_root: "/space/api/explorer/v3/my_space/obj/".to_string(),
            personal_folders: "/space/api/explorer/v3/my_space/folder/".to_string(),
            shared_folders: "/space/api/explorer/v2/share/folder/list/".to_string(),
            export_create: "/space/api/export/create/".to_string(),
            export_result: "/space/api/export/result/".to_string(),
            download_template: "/space/api/box/stream/download/all/{file_token}/?synced_block_host_token={token}&synced_block_host_type={type}".to_string(),
        }
    }
}

impl ApiEndpoints {
    fn from_env() -> Self {
        let default = Self::default();
        Self {
            children_list: env::var("SPACE_ENDPOINT_CHILDREN").unwrap_or(default.children_list),
            personal_root: env::var("SPACE_ENDPOINT_PERSONAL_ROOT")
                .unwrap_or(default.personal_root),
            personal_folders: env::var("SPACE_ENDPOINT_PERSONAL_FOLDERS")
                .unwrap_or(default.personal_folders),
            shared_folders: env::var("SPACE_ENDPOINT_SHARED_FOLDERS")
                .unwrap_or(default.shared_folders),
            export_create: env::var("SPACE_ENDPOINT_EXPORT_CREATE")
                .unwrap_or(default.export_create),
            export_result: env::var("SPACE_ENDPOINT_EXPORT_RESULT")
                .unwrap_or(default.export_result),
            download_template: env::var("SPACE_ENDPOINT_DOWNLOAD")
                .unwrap_or(default.download_template),
        }
    }
}

/// Workspace export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Workspace origin the listing and export endpoints live on
    pub base_url: String,

    /// Host serving the exported binaries
    pub stream_base_url: String,

    /// Session cookie header sent with every request (default: none)
    pub cookie: Option<String>,

    /// Cookie holding the CSRF token for export creation (default: "_csrf_token")
    pub csrf_cookie_name: String,

    /// Labels of the two virtual roots
    pub labels: RootLabels,

    /// Listing page size (default: 50)
    pub page_size: u32,

    /// Maximum pages followed per paginated listing (default: 20)
    pub max_pages: u32,

    /// Throttle before each remote call (default: 300 ms)
    pub request_delay: Duration,

    /// Throttle before each namespace's first-level listing (default: 500 ms)
    pub namespace_delay: Duration,

    /// Wait before the first export poll (default: 2 s)
    pub export_initial_delay: Duration,

    /// Wait before each export poll (default: 1 s)
    pub poll_interval: Duration,

    /// Export poll bound (default: 15)
    pub max_poll_attempts: u32,

    /// Ceiling for one file's export, poll and fetch (default: 5 min)
    pub file_timeout: Duration,

    /// Export worker pool size (default: 1, strictly sequential)
    pub max_concurrent_exports: usize,

    /// Per-request HTTP timeout for API calls (default: 60 s). Downloads
    /// are bounded by `file_timeout` instead.
    pub http_timeout: Duration,

    pub endpoints: ApiEndpoints,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.feishu.cn".to_string(),
            stream_base_url: "https://internal-api-drive-stream.feishu.cn".to_string(),
            cookie: None,
            csrf_cookie_name: "_csrf_token".to_string(),
            labels: RootLabels::default(),
            page_size: 50,
            max_pages: 20,
            request_delay: Duration::from_millis(300),
            namespace_delay: Duration::from_millis(500),
            export_initial_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(1),
            max_poll_attempts: 15,
            file_timeout: Duration::from_secs(300),
            max_concurrent_exports: 1,
            http_timeout: Duration::from_secs(60),
            endpoints: ApiEndpoints::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_millis(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

impl ExportConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            base_url: env::var("SPACE_BASE_URL").unwrap_or(default.base_url),

            stream_base_url: env::var("SPACE_STREAM_BASE_URL")
                .unwrap_or(default.stream_base_url),

            cookie: env::var("SPACE_COOKIE")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            csrf_cookie_name: env::var("SPACE_CSRF_COOKIE").unwrap_or(default.csrf_cookie_name),

            labels: RootLabels::new(
                env::var("SPACE_PERSONAL_LABEL").unwrap_or(default.labels.personal),
                env::var("SPACE_SHARED_LABEL").unwrap_or(default.labels.shared),
            ),

            page_size: env_parse("SPACE_PAGE_SIZE").unwrap_or(default.page_size),

            max_pages: env_parse("SPACE_MAX_PAGES").unwrap_or(default.max_pages),

            request_delay: env_millis("SPACE_REQUEST_DELAY_MS").unwrap_or(default.request_delay),

            namespace_delay: env_millis("SPACE_NAMESPACE_DELAY_MS")
                .unwrap_or(default.namespace_delay),

            export_initial_delay: env_millis("SPACE_EXPORT_INITIAL_DELAY_MS")
                .unwrap_or(default.export_initial_delay),

            poll_interval: env_millis("SPACE_POLL_INTERVAL_MS").unwrap_or(default.poll_interval),

            max_poll_attempts: env_parse("SPACE_MAX_POLL_ATTEMPTS")
                .unwrap_or(default.max_poll_attempts),

            file_timeout: env_secs("SPACE_FILE_TIMEOUT_SECS").unwrap_or(default.file_timeout),

            max_concurrent_exports: env_parse::<usize>("SPACE_MAX_CONCURRENT_EXPORTS")
                .map(|n| n.max(1))
                .unwrap_or(default.max_concurrent_exports),

            http_timeout: env_secs("SPACE_HTTP_TIMEOUT_SECS").unwrap_or(default.http_timeout),

            endpoints: ApiEndpoints::from_env(),
        }
    }

    /// Create config for tests (no throttling, reference polling timings)
    pub fn testing() -> Self {
        Self {
            base_url: "http://127.0.0.1:9".to_string(),
            stream_base_url: "http://127.0.0.1:9".to_string(),
            request_delay: Duration::ZERO,
            namespace_delay: Duration::ZERO,
            http_timeout: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Download URL for a resolved export.
    pub fn download_url(&self, file_token: &str, doc_token: &str, export_type: &str) -> String {
        let path = self
            .endpoints
            .download_template
            .replace("{file_token}", file_token)
            .replace("{token}", doc_token)
            .replace("{type}", export_type);
        format!("{}{}", self.stream_base_url.trim_end_matches('/'), path)
    }
}
