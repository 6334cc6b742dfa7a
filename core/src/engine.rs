use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::thread::JoinHandle;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::DownloadConfig;
use crate::error::{CoreError, CoreResult};
use crate::fetcher::SegmentFetcher;
use crate::net::{NetClient, ReqwestNetClient};
use crate::resolver::PlaylistResolver;
use crate::scheduler::AdmissionGate;
use crate::segment::{ResolvedSegment, SegmentFailure, SegmentOutcome};
use crate::stop::{MarkerFile, StopSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Resolving,
    Dispatching,
    Draining,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Resolving => "resolving",
            RunState::Dispatching => "dispatching",
            RunState::Draining => "draining",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one run. Segment failures are listed here, never raised.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub playlist: String,
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_dispatched: usize,
    pub bytes: u64,
    pub stopped: bool,
    pub failures: Vec<SegmentFailure>,
}

impl DownloadReport {
    fn new(playlist: &str) -> Self {
        Self {
            playlist: playlist.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: SegmentOutcome) {
        match outcome {
            SegmentOutcome::Downloaded { bytes } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            SegmentOutcome::AlreadyPresent => self.skipped += 1,
            SegmentOutcome::Failed(failure) => {
                self.failed += 1;
                self.failures.push(failure);
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.not_dispatched == 0
    }
}

/// Coordinates one playlist download: resolve once, fan out one fetch
/// thread per segment behind the admission gate, then join them all.
pub struct DownloadEngine {
    pub config: DownloadConfig,
    net: Arc<dyn NetClient>,
    stop: Arc<dyn StopSignal>,
    gate: AdmissionGate,
    state: Mutex<RunState>,
}

impl DownloadEngine {
    pub fn new(config: DownloadConfig) -> CoreResult<Self> {
        config.validate()?;
        let net = ReqwestNetClient::new(&config.user_agent, config.request_timeout)?;
        let stop = MarkerFile::new(config.stop_marker.clone());
        Ok(Self {
            gate: AdmissionGate::new(config.concurrency),
            config,
            net: Arc::new(net),
            stop: Arc::new(stop),
            state: Mutex::new(RunState::Idle),
        })
    }

    pub fn with_net_client(mut self, net: Arc<dyn NetClient>) -> Self {
        self.net = net;
        self
    }

    pub fn with_stop_signal(mut self, stop: Arc<dyn StopSignal>) -> Self {
        self.stop = stop;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn state(&self) -> RunState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: RunState) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let from = *state;
        debug!(from = %from, to = %next, "run state");
        *state = next;
    }

    /// Downloads every segment of `source` under `output`.
    ///
    /// Only resolution failures are returned as errors. Individual segment
    /// failures end up in the report.
    pub fn run(&self, source: &str, output: impl AsRef<Path>) -> CoreResult<DownloadReport> {
        let output = output.as_ref().to_path_buf();
        let started = Instant::now();
        if self.stop.should_stop() {
            warn!("stop signal present before start, no segments will be dispatched");
        }

        self.set_state(RunState::Resolving);
        let segments = match PlaylistResolver::new(Arc::clone(&self.net)).resolve(source) {
            Ok(segments) => segments,
            Err(err) => {
                error!(playlist = source, error = %err, "playlist resolution failed");
                self.set_state(RunState::Failed);
                return Err(err);
            }
        };

        let mut report = DownloadReport::new(source);
        report.total = segments.len();
        if segments.is_empty() {
            self.set_state(RunState::Done);
            info!(playlist = source, "no segments to download");
            return Ok(report);
        }

        self.set_state(RunState::Dispatching);
        let handles = self.dispatch(segments, output, &mut report);

        self.set_state(RunState::Draining);
        for (segment, handle) in handles {
            match handle.join() {
                Ok(outcome) => report.record(outcome),
                Err(_) => {
                    let err = CoreError::Io("fetch thread panicked".to_string());
                    report.record(SegmentOutcome::Failed(SegmentFailure::new(&segment, &err)))
                }
            }
        }

        self.set_state(RunState::Done);
        info!(
            playlist = source,
            total = report.total,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            not_dispatched = report.not_dispatched,
            bytes = report.bytes,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "download finished"
        );
        Ok(report)
    }

    fn dispatch(
        &self,
        segments: Vec<ResolvedSegment>,
        output: PathBuf,
        report: &mut DownloadReport,
    ) -> Vec<(ResolvedSegment, JoinHandle<SegmentOutcome>)> {
        let fetcher = SegmentFetcher::new(Arc::clone(&self.net), output);
        let total = segments.len();
        let mut handles = Vec::with_capacity(total);

        for segment in segments {
            if self.stop.should_stop() {
                self.halt(report, total - handles.len());
                break;
            }
            let permit = self.gate.acquire();
            // The wait for a slot can be long; look again before launching.
            if self.stop.should_stop() {
                drop(permit);
                self.halt(report, total - handles.len());
                break;
            }

            let fetcher = fetcher.clone();
            let task_segment = segment.clone();
            let handle = thread::spawn(move || fetcher.run(&task_segment, permit));
            handles.push((segment, handle));
        }
        handles
    }

    fn halt(&self, report: &mut DownloadReport, remaining: usize) {
        warn!(
            remaining,
            "stop signal detected, waiting for in-flight segments before shutting down"
        );
        report.stopped = true;
        report.not_dispatched = remaining;
    }
}

impl fmt::Debug for DownloadEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadEngine")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
