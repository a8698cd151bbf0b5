//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use statehist_config::ConfigError;
use statehist_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to Loki at {url}")]
    #[diagnostic(
        code(statehist::connection_failed),
        help(
            "Check that Loki is running and reachable.\n\
             Configured via state_history.loki_remote_url / loki_remote_read_url.\n\
             Try: statehist backend --ping"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Loki request timed out")]
    #[diagnostic(
        code(statehist::timeout),
        help("Raise state_history.timeout_secs or narrow the query with --from/--to.")
    )]
    Timeout,

    #[error("Query interrupted")]
    #[diagnostic(code(statehist::interrupted))]
    Interrupted,

    // ── Resources ────────────────────────────────────────────────────
    #[error("Alert rule {rule_id} not found in org {org_id}")]
    #[diagnostic(
        code(statehist::rule_not_found),
        help("Rules are resolved through [[catalog.rules]] in the config file.")
    )]
    RuleNotFound { org_id: i64, rule_id: i64 },

    #[error("Lookup failed: {message}")]
    #[diagnostic(code(statehist::lookup))]
    Lookup { message: String },

    // ── Loki ─────────────────────────────────────────────────────────
    #[error(
        "Loki rejected the query{}: {message}",
        .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
    )]
    #[diagnostic(code(statehist::loki))]
    Loki {
        status: Option<u16>,
        message: String,
        #[help]
        hint: Option<String>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(statehist::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(statehist::config),
        help("Pass --config <FILE> or set STATEHIST_* environment variables.")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(statehist::json))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(statehist::internal))]
    Internal(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::RuleNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

const RETRY_HINT: &str = "Loki is overloaded or restarting; retry the query shortly.";

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let transient = err.is_transient();
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::Cancelled => CliError::Interrupted,

            CoreError::RuleNotFound { org_id, rule_id } => {
                CliError::RuleNotFound { org_id, rule_id }
            }

            CoreError::Lookup(e) => CliError::Lookup {
                message: e.to_string(),
            },

            CoreError::InvalidTimeRange { from, to } => CliError::Validation {
                field: "--from/--to".into(),
                reason: format!("from ({from}) is after to ({to})"),
            },

            CoreError::QueryTooLong { size, max } => CliError::Validation {
                field: "query".into(),
                reason: format!(
                    "rendered LogQL is {size} bytes, above loki_max_query_size ({max})"
                ),
            },

            CoreError::Backend { message, status } => CliError::Loki {
                status,
                message,
                hint: transient.then(|| RETRY_HINT.to_owned()),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}
