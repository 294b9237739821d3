//! Command-line flags (spec §6), grounded on the teacher's `bitvia-ai.rs`
//! `#[derive(Parser)]` style, extended with the short flags the original
//! `feedor.py` `argparse` block defines.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "feedhub", about = "Self-hosted feed aggregator")]
pub struct Args {
    /// Serve the HTTP surface.
    #[arg(short = 's', long)]
    pub serve: bool,

    /// Run one update before serving, then continue polling periodically.
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Write a static render to this path and exit; format chosen by
    /// extension (`.atom`, `.html`, otherwise RSS).
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub output_file: Option<String>,

    /// Page size for `list`/static renders.
    #[arg(short = 'n', long = "limit", default_value_t = 50)]
    pub limit: u32,

    /// Poll period in seconds.
    #[arg(short = 't', long = "period", default_value_t = 3600)]
    pub period_secs: u64,

    /// Bind address, `HOST:PORT`.
    #[arg(short = 'p', long = "bind", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Disable conditional-GET caching (ETag / If-Modified-Since).
    #[arg(long = "no-etag")]
    pub no_etag: bool,

    /// Path to the feed list file.
    #[arg(long = "feeds", default_value = "feeds.txt")]
    pub feeds_path: String,

    /// Path to the embedded database file.
    #[arg(long = "db", default_value = "feeds.db")]
    pub db_path: String,
}
