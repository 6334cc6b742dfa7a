pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod hls;
pub mod net;
pub mod resolver;
pub mod scheduler;
pub mod segment;
pub mod stop;


pub use crate::config::DownloadConfig;
pub use crate::engine::{DownloadEngine, DownloadReport, RunState};
pub use crate::error::{CoreError, CoreResult};
pub use crate::segment::{ResolvedSegment, SegmentOutcome};
