// ── Core error types ──
//
// User-facing errors from statehist-core. Consumers never see raw HTTP
// status handling or JSON parse failures from the Loki client; the
// `From<statehist_api::Error>` impl translates them into query-level
// variants.

use thiserror::Error;

use crate::lookup::LookupError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to Loki at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Loki request timed out")]
    Timeout,

    #[error("Query cancelled")]
    Cancelled,

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Alert rule not found: org {org_id}, id {rule_id}")]
    RuleNotFound { org_id: i64, rule_id: i64 },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    // ── Query errors ─────────────────────────────────────────────────
    #[error("Invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: i64, to: i64 },

    #[error("Query is too long: {size} bytes exceeds the maximum of {max}")]
    QueryTooLong { size: usize, max: usize },

    // ── Backend errors (wrapped, not exposed raw) ────────────────────
    #[error("Loki error: {message}")]
    Backend {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` when retrying the same query may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            Self::Backend {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<statehist_api::Error> for CoreError {
    fn from(err: statehist_api::Error) -> Self {
        if err.is_timeout() {
            return CoreError::Timeout;
        }
        match err {
            statehist_api::Error::Transport(e) => {
                if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Backend {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            statehist_api::Error::Loki { status, body } => {
                let message = if body.trim().is_empty() {
                    format!("HTTP {status}")
                } else {
                    body.trim().to_owned()
                };
                CoreError::Backend {
                    message,
                    status: Some(status),
                }
            }
            statehist_api::Error::InvalidRange { start, end } => CoreError::InvalidTimeRange {
                from: start.div_euclid(1_000_000),
                to: end.div_euclid(1_000_000),
            },
            statehist_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid Loki URL: {e}"),
            },
            statehist_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS: {msg}"),
            },
            statehist_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("unexpected Loki response: {message}"))
            }
        }
    }
}
