use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("playlist unavailable: {url} returned status {status}")]
    PlaylistUnavailable { url: String, status: u16 },
    #[error("playlist parse error: {0}")]
    PlaylistParse(String),
    #[error("segment fetch failed: {url} returned status {status}")]
    SegmentStatus { url: String, status: u16 },
    #[error("io error: {0}")]
    Io(String),
    #[error("malformed uri reference {reference:?}: {reason}")]
    MalformedUri { reference: String, reason: String },
    #[error("invalid playlist source: {0}")]
    InvalidSource(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
