use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// Marker whose presence asks a running download to stop dispatching.
pub const DEFAULT_STOP_MARKER: &str = "/tmp/dlm3u8.stop";

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Upper bound on segment fetches in flight at once.
    pub concurrency: usize,
    pub user_agent: String,
    pub stop_marker: PathBuf,
    /// `None` keeps the HTTP client's default.
    pub request_timeout: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            user_agent: concat!("hlsgrab/", env!("CARGO_PKG_VERSION")).to_string(),
            stop_marker: PathBuf::from(DEFAULT_STOP_MARKER),
            request_timeout: None,
        }
    }
}

impl DownloadConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.concurrency == 0 {
            return Err(CoreError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(CoreError::InvalidConfig("user agent is empty".to_string()));
        }
        Ok(())
    }
}
