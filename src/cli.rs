//! Command line arguments of the `metrics-collector` binary.
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

/// Scrape a fleet of machines, relabel their metrics and push them to a gateway.
#[derive(Parser, Debug, Clone)]
#[command(name = "metrics-collector")]
#[command(version)]
pub struct Args {
    /// JSON inventory of the machines to scrape.
    #[arg(long = "json", value_name = "FILE")]
    pub inventory: PathBuf,

    /// Delete the previous push of a machine before pushing again.
    #[arg(long)]
    pub delete_old: bool,

    /// Grouping label appended to the push URL, as <name>=<value>.
    #[arg(long = "push-label", value_name = "NAME=VALUE")]
    pub push_labels: Vec<String>,

    /// Label under which the machine name is pushed.
    #[arg(long, value_name = "LABEL")]
    pub machine_label: String,

    /// Base URL of the push endpoint.
    #[arg(long, value_name = "URL")]
    pub push_url: String,

    /// Path to scrape on every machine, with its leading slash.
    #[arg(long = "read-path", value_name = "PATH", required = true)]
    pub read_paths: Vec<String>,

    /// Add a label to every sample, as <label>=<value>.
    #[arg(short = 'a', long = "add-label", value_name = "LABEL=VALUE")]
    pub add_labels: Vec<String>,

    /// Drop the metric family with this name.
    #[arg(short = 'd', long = "drop-metric", value_name = "NAME")]
    pub drop_metrics: Vec<String>,

    /// Drop the go_, process_ and promhttp_ self-instrumentation families.
    #[arg(long)]
    pub drop_default: bool,

    /// Relabel this exposition file instead of the scraped bodies.
    #[arg(long = "in", value_name = "FILE")]
    pub in_file: Option<PathBuf>,

    /// Relabel the exposition files of this directory instead of the scraped bodies.
    #[arg(long, value_name = "DIR")]
    pub in_dir: Option<PathBuf>,

    /// Write to this file instead of pushing; `{machine}` is replaced by the machine name.
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Timeout of every HTTP request, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Repeat the cycle every N seconds instead of running it once.
    #[arg(long, value_name = "N")]
    pub interval_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
