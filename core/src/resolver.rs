use std::io::Read;
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::error::{CoreError, CoreResult};
use crate::hls::{resolve_segments, HlsDecoder, PlaylistKind};
use crate::net::{DownloadRequest, NetClient};
use crate::segment::ResolvedSegment;

/// Playlists are small text files; anything bigger is not an index.
const MAX_PLAYLIST_BYTES: u64 = 16 * 1024 * 1024;

/// Fetches a playlist once and turns it into fetchable segment URLs.
#[derive(Clone)]
pub struct PlaylistResolver {
    net: Arc<dyn NetClient>,
}

impl PlaylistResolver {
    pub fn new(net: Arc<dyn NetClient>) -> Self {
        Self { net }
    }

    pub fn fetch_playlist(&self, source: &str) -> CoreResult<PlaylistKind> {
        let resp = self.net.get(&DownloadRequest::new(source))?;
        if !resp.is_success() {
            return Err(CoreError::PlaylistUnavailable {
                url: source.to_string(),
                status: resp.status_code,
            });
        }
        let mut body = Vec::new();
        resp.body
            .take(MAX_PLAYLIST_BYTES + 1)
            .read_to_end(&mut body)
            .map_err(|err| CoreError::Transport(err.to_string()))?;
        if body.len() as u64 > MAX_PLAYLIST_BYTES {
            return Err(CoreError::PlaylistParse(format!(
                "playlist exceeds {} MiB",
                MAX_PLAYLIST_BYTES / (1024 * 1024)
            )));
        }
        HlsDecoder::parse_playlist(&body)
    }

    /// Resolves `source` into ordered segments. Non-media playlists resolve
    /// to an empty list; variant expansion is left to the caller.
    pub fn resolve(&self, source: &str) -> CoreResult<Vec<ResolvedSegment>> {
        let base = Url::parse(source)
            .map_err(|err| CoreError::InvalidSource(format!("{}: {}", source, err)))?;

        let media = match self.fetch_playlist(source)? {
            PlaylistKind::Media(media) => media,
            other => {
                warn!(
                    playlist = source,
                    kind = other.name(),
                    "not a media playlist, nothing to download"
                );
                return Ok(Vec::new());
            }
        };

        let descriptors = HlsDecoder::extract_segments(&media);
        let segments = resolve_segments(&base, &descriptors);
        info!(
            playlist = source,
            segments = segments.len(),
            dropped = descriptors.len() - segments.len(),
            "playlist resolved"
        );
        Ok(segments)
    }
}
