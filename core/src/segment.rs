use serde::Serialize;
use std::fmt;

use crate::error::CoreError;
use std::path::{Path, PathBuf};
use url::Url;

/// Used when a segment URL has no final path component to name the file.
const FALLBACK_FILE_NAME: &str = "download.bin";

/// Raw playlist entry, before it is anchored against the playlist URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    pub index: usize,
    pub uri: String,
}

impl SegmentDescriptor {
    pub fn new(index: usize, uri: impl Into<String>) -> Self {
        Self {
            index,
            uri: uri.into(),
        }
    }
}

/// Fully qualified, percent-decoded fetch URL for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSegment {
    pub index: usize,
    pub url: String,
}

impl ResolvedSegment {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }

    pub fn output_path(&self, root: &Path) -> PathBuf {
        output_path(root, &self.url)
    }
}

/// Maps a segment URL onto `root` by appending the URL's path component.
///
/// Only the path takes part, so the same URL always lands on the same file.
/// Empty, `.` and `..` components are dropped to keep the result under `root`.
pub fn output_path(root: &Path, url: &str) -> PathBuf {
    let raw_path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let components: Vec<String> = raw_path
        .split('/')
        .map(|part| {
            urlencoding::decode(part)
                .map(|value| value.into_owned())
                .unwrap_or_else(|_| part.to_string())
        })
        .filter(|part| !part.is_empty() && part != "." && part != "..")
        .collect();

    let mut path = root.to_path_buf();
    let has_file_name = !raw_path.ends_with('/') && !components.is_empty();
    for part in &components {
        path.push(part);
    }
    if !has_file_name {
        path.push(FALLBACK_FILE_NAME);
    }
    path
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "status", rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Status(u16),
    Io,
}

impl FailureKind {
    /// Transport and status errors keep their class; everything else that
    /// can go wrong inside a fetch is local.
    pub fn of(err: &CoreError) -> Self {
        match err {
            CoreError::Transport(_) => FailureKind::Transport,
            CoreError::SegmentStatus { status, .. } => FailureKind::Status(*status),
            _ => FailureKind::Io,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Transport => f.write_str("transport"),
            FailureKind::Status(code) => write!(f, "status {}", code),
            FailureKind::Io => f.write_str("io"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentFailure {
    pub index: usize,
    pub url: String,
    pub kind: FailureKind,
    pub message: String,
}

impl SegmentFailure {
    pub fn new(segment: &ResolvedSegment, err: &CoreError) -> Self {
        Self {
            index: segment.index,
            url: segment.url.clone(),
            kind: FailureKind::of(err),
            message: err.to_string(),
        }
    }
}

/// Result of one fetch task. Observational only; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    Downloaded { bytes: u64 },
    AlreadyPresent,
    Failed(SegmentFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_mirrors_remote_path() {
        let root = Path::new("/data/out");
        assert_eq!(
            output_path(root, "https://cdn.example/vod/720p/seg-001.ts?token=abc"),
            PathBuf::from("/data/out/vod/720p/seg-001.ts")
        );
    }

    #[test]
    fn output_path_is_stable_for_same_url() {
        let root = Path::new("out");
        let url = "http://h.example/a/b.ts";
        assert_eq!(output_path(root, url), output_path(root, url));
    }

    #[test]
    fn output_path_stays_under_root() {
        let root = Path::new("out");
        assert_eq!(
            output_path(root, "http://h.example/a/%2e%2e/%2e%2e/etc/passwd"),
            PathBuf::from("out/etc/passwd")
        );
    }

    #[test]
    fn output_path_decodes_components() {
        let root = Path::new("out");
        assert_eq!(
            output_path(root, "http://h.example/my%20show/ep%201.ts"),
            PathBuf::from("out/my show/ep 1.ts")
        );
    }

    #[test]
    fn directory_urls_get_a_file_name() {
        let root = Path::new("out");
        assert_eq!(
            output_path(root, "http://h.example/live/"),
            PathBuf::from("out/live/download.bin")
        );
        assert_eq!(
            output_path(root, "http://h.example"),
            PathBuf::from("out/download.bin")
        );
    }

    #[test]
    fn failure_kind_follows_error_class() {
        let segment = ResolvedSegment::new(0, "http://h.example/a.ts");
        let status = SegmentFailure::new(
            &segment,
            &CoreError::SegmentStatus {
                url: segment.url.clone(),
                status: 404,
            },
        );
        assert_eq!(status.kind, FailureKind::Status(404));
        assert!(status.message.contains("returned status 404"));

        let transport = SegmentFailure::new(&segment, &CoreError::Transport("reset".to_string()));
        assert_eq!(transport.kind, FailureKind::Transport);

        let io = SegmentFailure::new(&segment, &CoreError::Io("disk full".to_string()));
        assert_eq!(io.kind, FailureKind::Io);
        assert_eq!(io.message, "io error: disk full");
    }
}
