use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hlsgrab_core::config::DEFAULT_STOP_MARKER;
use hlsgrab_core::DownloadConfig;

/// Download every segment of an HLS media playlist into a local tree.
#[derive(Debug, Parser)]
#[command(name = "hlsgrab", version)]
#[command(about = "Mirror the segments of an HLS media playlist", long_about = None)]
pub struct Cli {
    /// m3u8 media playlist URL.
    #[arg(long, env = "HLSGRAB_URL")]
    pub url: String,

    /// Directory the segment tree is written under.
    #[arg(long, short, env = "HLSGRAB_OUTPUT")]
    pub output: PathBuf,

    /// Segments downloaded at the same time.
    #[arg(
        long = "thread",
        short = 't',
        alias = "concurrency",
        env = "HLSGRAB_THREADS",
        default_value = "1",
        value_name = "N"
    )]
    pub threads: NonZeroUsize,

    /// Dispatch stops while this file exists.
    #[arg(long, env = "HLSGRAB_STOP_FILE", default_value = DEFAULT_STOP_MARKER)]
    pub stop_file: PathBuf,

    #[arg(long, env = "HLSGRAB_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds. Unset keeps the client default.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also append log lines to this file.
    #[arg(long, env = "HLSGRAB_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn download_config(&self) -> DownloadConfig {
        let mut config = DownloadConfig::default().with_concurrency(self.threads.get());
        config.stop_marker = self.stop_file.clone();
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config.request_timeout = self.timeout.map(Duration::from_secs);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn url_and_output_are_required() {
        assert!(Cli::try_parse_from(["hlsgrab", "--output", "out"]).is_err());
        assert!(Cli::try_parse_from(["hlsgrab", "--url", "http://h/i.m3u8"]).is_err());
    }

    #[test]
    fn defaults_to_one_thread() {
        let cli = parse(&["hlsgrab", "--url", "http://h/i.m3u8", "--output", "out"]);
        assert_eq!(cli.threads.get(), 1);
        assert_eq!(cli.stop_file, PathBuf::from(DEFAULT_STOP_MARKER));
        let config = cli.download_config();
        assert_eq!(config.concurrency, 1);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn thread_flag_sets_concurrency() {
        let cli = parse(&[
            "hlsgrab", "--url", "http://h/i.m3u8", "-o", "out", "-t", "8", "--timeout", "30",
        ]);
        let config = cli.download_config();
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(Cli::try_parse_from([
            "hlsgrab", "--url", "http://h/i.m3u8", "--output", "out", "--thread", "0"
        ])
        .is_err());
    }
}
