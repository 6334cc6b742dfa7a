use std::fmt;
use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_LENGTH;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Status line plus a streaming body. The body is read lazily so large
/// segments never sit in memory.
pub struct DownloadResponse {
    pub status_code: u16,
    pub total_bytes: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl DownloadResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

impl fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("status_code", &self.status_code)
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// One GET per call. Implementations must be shareable across fetch threads.
pub trait NetClient: Send + Sync {
    fn get(&self, req: &DownloadRequest) -> CoreResult<DownloadResponse>;
}

#[derive(Clone)]
pub struct ReqwestNetClient {
    client: Client,
}

impl ReqwestNetClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> CoreResult<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| CoreError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

impl NetClient for ReqwestNetClient {
    fn get(&self, req: &DownloadRequest) -> CoreResult<DownloadResponse> {
        let resp = self
            .client
            .get(&req.url)
            .send()
            .map_err(|err| CoreError::Transport(err.to_string()))?;
        let total_bytes = resp
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        Ok(DownloadResponse {
            status_code: resp.status().as_u16(),
            total_bytes,
            body: Box::new(resp),
        })
    }
}
