use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::net::{DownloadRequest, NetClient};
use crate::scheduler::GatePermit;
use crate::segment::{ResolvedSegment, SegmentFailure, SegmentOutcome};

/// Downloads single segments into a tree mirroring their remote paths.
#[derive(Clone)]
pub struct SegmentFetcher {
    net: Arc<dyn NetClient>,
    output_root: PathBuf,
}

impl SegmentFetcher {
    pub fn new(net: Arc<dyn NetClient>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            net,
            output_root: output_root.into(),
        }
    }

    /// Fetches `segment` while holding `permit`, giving the slot back only
    /// once the fetch has fully finished.
    pub fn run(&self, segment: &ResolvedSegment, permit: GatePermit) -> SegmentOutcome {
        let outcome = self.fetch(segment);
        drop(permit);
        outcome
    }

    pub fn fetch(&self, segment: &ResolvedSegment) -> SegmentOutcome {
        let dest = segment.output_path(&self.output_root);
        if dest.is_file() {
            info!(index = segment.index, path = %dest.display(), "segment exists, skipping");
            return SegmentOutcome::AlreadyPresent;
        }

        debug!(index = segment.index, url = %segment.url, "segment download started");
        let started = Instant::now();

        let mut response = match self.net.get(&DownloadRequest::new(segment.url.clone())) {
            Ok(resp) => resp,
            Err(err) => return fail(segment, err),
        };
        if !response.is_success() {
            return fail(
                segment,
                CoreError::SegmentStatus {
                    url: segment.url.clone(),
                    status: response.status_code,
                },
            );
        }

        if let Some(parent) = dest.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                return fail(
                    segment,
                    CoreError::Io(format!("create dir {}: {}", parent.display(), err)),
                );
            }
        }

        // create_new never truncates: a concurrent or earlier writer wins.
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&dest) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists && dest.is_file() => {
                info!(
                    index = segment.index,
                    path = %dest.display(),
                    "segment exists, skipping"
                );
                return SegmentOutcome::AlreadyPresent;
            }
            Err(err) => {
                return fail(
                    segment,
                    CoreError::Io(format!("create file {}: {}", dest.display(), err)),
                )
            }
        };

        let bytes = match io::copy(&mut response.body, &mut file) {
            Ok(bytes) => bytes,
            Err(err) => {
                return fail(
                    segment,
                    CoreError::Io(format!("write file {}: {}", dest.display(), err)),
                )
            }
        };

        info!(
            index = segment.index,
            url = %segment.url,
            path = %dest.display(),
            bytes,
            expected = ?response.total_bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "segment saved"
        );
        SegmentOutcome::Downloaded { bytes }
    }
}

fn fail(segment: &ResolvedSegment, err: CoreError) -> SegmentOutcome {
    let failure = SegmentFailure::new(segment, &err);
    warn!(
        index = segment.index,
        url = %segment.url,
        kind = %failure.kind,
        error = %err,
        "segment failed"
    );
    SegmentOutcome::Failed(failure)
}
