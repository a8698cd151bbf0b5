//! Clap derive structures for the `statehist` CLI.

use std::path::PathBuf;

use chrono::DateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// statehist -- read alert state history annotations from Loki
#[derive(Debug, Parser)]
#[command(
    name = "statehist",
    version,
    about = "Query alert state history annotations stored in Loki",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "STATEHIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "STATEHIST_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Query alert state annotations
    #[command(alias = "q")]
    Query(QueryArgs),

    /// Show whether Loki serves annotation reads for this configuration
    Backend(BackendArgs),
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Organization id
    #[arg(long, default_value_t = 1)]
    pub org: i64,

    /// Alert rule id
    #[arg(long)]
    pub alert_id: Option<i64>,

    /// Dashboard id
    #[arg(long)]
    pub dashboard_id: Option<i64>,

    /// Dashboard UID (takes precedence over --dashboard-id)
    #[arg(long)]
    pub dashboard_uid: Option<String>,

    /// Panel id
    #[arg(long)]
    pub panel_id: Option<i64>,

    /// Annotation type filter ("alert"; anything else yields no results)
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Start of the range, inclusive (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub from: Option<i64>,

    /// End of the range, exclusive (RFC 3339 or epoch milliseconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub to: Option<i64>,

    /// Maximum entries to fetch from Loki
    #[arg(long)]
    pub limit: Option<i64>,
}

#[derive(Debug, Args)]
pub struct BackendArgs {
    /// Also check that Loki is reachable
    #[arg(long)]
    pub ping: bool,
}

/// Parse a time bound given as epoch milliseconds or RFC 3339.
pub fn parse_timestamp(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.timestamp_millis())
        .map_err(|e| format!("expected RFC 3339 or epoch milliseconds: {e}"))
}
