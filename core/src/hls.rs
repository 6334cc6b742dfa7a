use crate::error::{CoreError, CoreResult};
use crate::segment::{ResolvedSegment, SegmentDescriptor};
use m3u8_rs::{MediaPlaylist, Playlist};
use tracing::warn;
use url::Url;

/// Decoded index, tagged by kind. Only `Media` carries segments we can fetch.
#[derive(Debug, Clone)]
pub enum PlaylistKind {
    Media(MediaPlaylist),
    Master { variants: usize },
    Unknown,
}

impl PlaylistKind {
    pub fn name(&self) -> &'static str {
        match self {
            PlaylistKind::Media(_) => "media",
            PlaylistKind::Master { .. } => "master",
            PlaylistKind::Unknown => "unknown",
        }
    }
}

pub struct HlsDecoder;

impl HlsDecoder {
    pub fn parse_playlist(content: &[u8]) -> CoreResult<PlaylistKind> {
        let playlist = match m3u8_rs::parse_playlist(content) {
            Ok((_, playlist)) => playlist,
            Err(err) => return Err(CoreError::PlaylistParse(err.to_string())),
        };
        Ok(match playlist {
            Playlist::MediaPlaylist(media) => PlaylistKind::Media(media),
            Playlist::MasterPlaylist(master) => {
                if master.variants.is_empty() && master.alternatives.is_empty() {
                    PlaylistKind::Unknown
                } else {
                    PlaylistKind::Master {
                        variants: master.variants.len(),
                    }
                }
            }
        })
    }

    /// Segment references in playback order, skipping blank entries.
    /// Indices stay contiguous after skipping.
    pub fn extract_segments(media: &MediaPlaylist) -> Vec<SegmentDescriptor> {
        media
            .segments
            .iter()
            .map(|s| s.uri.trim())
            .filter(|uri| !uri.is_empty())
            .enumerate()
            .map(|(index, uri)| SegmentDescriptor::new(index, uri))
            .collect()
    }
}

fn has_http_scheme(reference: &str) -> bool {
    let lower = reference
        .get(..8)
        .unwrap_or(reference)
        .to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn percent_decode(reference: &str, value: &str) -> CoreResult<String> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| CoreError::MalformedUri {
            reference: reference.to_string(),
            reason: err.to_string(),
        })
}

/// Turns one playlist reference into a fetch URL.
///
/// Absolute `http`/`https` references are decoded as-is; anything else is
/// joined onto `base` first.
pub fn normalize_reference(base: &Url, reference: &str) -> CoreResult<String> {
    if has_http_scheme(reference) {
        return percent_decode(reference, reference);
    }
    let joined = base.join(reference).map_err(|err| CoreError::MalformedUri {
        reference: reference.to_string(),
        reason: err.to_string(),
    })?;
    percent_decode(reference, joined.as_str())
}

/// Normalizes every descriptor, dropping the ones that cannot be resolved.
/// Survivors keep their relative order and are renumbered from zero.
pub fn resolve_segments(base: &Url, descriptors: &[SegmentDescriptor]) -> Vec<ResolvedSegment> {
    let mut out = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        match normalize_reference(base, &descriptor.uri) {
            Ok(url) => out.push(ResolvedSegment::new(out.len(), url)),
            Err(err) => {
                warn!(index = descriptor.index, error = %err, "dropping segment reference");
            }
        }
    }
    out
}
