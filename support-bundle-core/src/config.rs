use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

/// Upload destination used when no target server is configured.
pub const DEFAULT_SUPPORT_LOGS_URL: &str = "https://supportlogs.jfrog.com/";
pub const DEFAULT_TARGET_REPO: &str = "logs";
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// How requests against a server are authenticated.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    #[default]
    None,
    Basic { user: String, password: String },
    Bearer { access_token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::None => f.write_str("None"),
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"***")
                .finish(),
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("access_token", &"***")
                .finish(),
        }
    }
}

/// A repository server endpoint. The base URL always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConnection {
    base_url: String,
    pub credentials: Credentials,
}

impl ServerConnection {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        let mut base_url = base_url.into().trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            credentials,
        }
    }

    /// Connection to the public support logs service, without credentials.
    pub fn support_logs() -> Self {
        Self::new(DEFAULT_SUPPORT_LOGS_URL, Credentials::None)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Joins a relative endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Polling limits for the download phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Wall-clock deadline measured from the start of the download phase.
    pub timeout: Duration,
    /// Minimum spacing between two readiness polls.
    pub interval: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Everything a single pipeline run needs, built once at the CLI boundary.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub case_number: String,
    pub target_repo: String,
    pub retry: RetryBudget,
    /// Delete the local archive once the run finishes.
    pub cleanup: bool,
    /// Where downloaded archives are written. Defaults to the system temp dir.
    pub download_dir: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn new(case_number: impl Into<String>) -> Self {
        Self {
            case_number: case_number.into().trim().to_string(),
            target_repo: DEFAULT_TARGET_REPO.to_string(),
            retry: RetryBudget::default(),
            cleanup: true,
            download_dir: None,
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.download_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn trace_loaded(&self) {
        info!(
            case_number = %self.case_number,
            target_repo = %self.target_repo,
            timeout = ?self.retry.timeout,
            interval = ?self.retry.interval,
            cleanup = self.cleanup,
            "Loaded pipeline config"
        );
        debug!(?self, "Pipeline config loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let conn = ServerConnection::new("http://localhost:8082/artifactory", Credentials::None);
        assert_eq!(conn.base_url(), "http://localhost:8082/artifactory/");

        let already = ServerConnection::new("http://localhost:8082/artifactory/", Credentials::None);
        assert_eq!(already.base_url(), "http://localhost:8082/artifactory/");
    }

    #[test]
    fn endpoint_does_not_double_slashes() {
        let conn = ServerConnection::new("http://rt/", Credentials::None);
        assert_eq!(
            conn.endpoint("/api/system/support/bundle"),
            "http://rt/api/system/support/bundle"
        );
    }

    #[test]
    fn credentials_debug_hides_secrets() {
        let creds = Credentials::Basic {
            user: "admin".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn pipeline_defaults() {
        let conf = PipelineConfig::new("  12345 ");
        assert_eq!(conf.case_number, "12345");
        assert_eq!(conf.target_repo, "logs");
        assert!(conf.cleanup);
        assert_eq!(conf.retry.timeout, Duration::from_secs(600));
        assert_eq!(conf.retry.interval, Duration::from_secs(5));
    }
}
