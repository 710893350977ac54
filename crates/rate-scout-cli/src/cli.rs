use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser};

#[derive(Debug, Parser)]
#[command(
    name = "rate-scout",
    about = "Scan a hotel page for nightly rates over consecutive check-in dates",
    version
)]
pub struct Cli {
    /// Hotel page URL (http or https).
    pub hotel_url: String,

    /// Number of consecutive check-in dates to scan.
    #[arg(default_value_t = 60)]
    pub days_forward: u32,

    /// JSON array of room types to keep, e.g. '["room_only"]'.
    /// Defaults to both room_only and with_breakfast.
    pub room_types: Option<String>,

    /// First check-in date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// JSON extraction profile overriding the built-in selectors.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Replay saved `<YYYY-MM-DD>.html` pages from this directory instead of
    /// launching Chromium.
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    #[command(flatten)]
    pub timing: TimingArgs,

    /// Pretty-print the JSON result.
    #[arg(long)]
    pub pretty: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Overrides for the scan timings. Unset flags keep the library defaults.
#[derive(Debug, Default, Args)]
pub struct TimingArgs {
    /// Page load timeout per attempt.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Attempts per date, including the first.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Pause before retrying a failed attempt.
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Pause between dates.
    #[arg(long)]
    pub date_delay_ms: Option<u64>,

    /// Pause after a page loads, before extraction.
    #[arg(long)]
    pub settle_ms: Option<u64>,
}
