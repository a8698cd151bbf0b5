// ── History query construction ──
//
// Translates an annotation `ItemQuery` into the backend-facing
// `HistoryQuery` and renders it as LogQL. Also resolves the half-open
// millisecond window the query covers.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use chrono::{DateTime, Utc};

use statehist_api::types::{ORG_ID_LABEL, STATE_HISTORY_LABEL_KEY, STATE_HISTORY_LABEL_VALUE};

use crate::error::CoreError;
use crate::model::ItemQuery;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Backend query descriptor for alert state history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    pub org_id: i64,
    pub rule_uid: Option<String>,
    pub dashboard_uid: Option<String>,
    pub panel_id: Option<i64>,
    /// Inclusive lower bound, Unix milliseconds.
    pub from: i64,
    /// Exclusive upper bound, Unix milliseconds.
    pub to: i64,
}

/// Build the backend query for `query`.
///
/// An explicit dashboard UID on the query wins. Otherwise a non-zero
/// dashboard id is reverse-resolved through `dashboards` (UID -> id); an
/// id with no matching UID leaves the dashboard filter unset. `rule_uid`
/// is attached only when the query names an alert.
pub fn build_history_query(
    query: &ItemQuery,
    dashboards: &HashMap<String, i64>,
    rule_uid: Option<&str>,
) -> HistoryQuery {
    let dashboard_uid = query
        .dashboard_uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .or_else(|| {
            let id = query.dashboard_id()?;
            dashboards
                .iter()
                .find(|&(_, &candidate)| candidate == id)
                .map(|(uid, _)| uid.clone())
        });

    let rule_uid = query
        .alert_id()
        .and(rule_uid)
        .filter(|uid| !uid.is_empty())
        .map(str::to_owned);

    HistoryQuery {
        org_id: query.org_id,
        rule_uid,
        dashboard_uid,
        panel_id: query.panel_id(),
        from: query.from.unwrap_or_default(),
        to: query.to.unwrap_or_default(),
    }
}

impl HistoryQuery {
    /// Replace the time bounds with a resolved window.
    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.from = window.from;
        self.to = window.to;
        self
    }

    fn has_log_filters(&self) -> bool {
        self.rule_uid.is_some() || self.dashboard_uid.is_some() || self.panel_id.is_some()
    }

    /// Render as a LogQL log query.
    ///
    /// ```text
    /// {orgID="1",from="state-history"} | json | ruleUID="abc" | panelID=2
    /// ```
    ///
    /// Fails with [`CoreError::QueryTooLong`] when the rendered query is
    /// longer than `max_size` bytes.
    pub fn to_logql(&self, max_size: usize) -> Result<String, CoreError> {
        let mut logql = format!(
            "{{{ORG_ID_LABEL}={},{STATE_HISTORY_LABEL_KEY}={}}}",
            quote(&self.org_id.to_string()),
            quote(STATE_HISTORY_LABEL_VALUE),
        );

        if self.has_log_filters() {
            logql.push_str(" | json");
        }
        if let Some(uid) = &self.rule_uid {
            let _ = write!(logql, " | ruleUID={}", quote(uid));
        }
        if let Some(uid) = &self.dashboard_uid {
            let _ = write!(logql, " | dashboardUID={}", quote(uid));
        }
        if let Some(panel_id) = self.panel_id {
            let _ = write!(logql, " | panelID={panel_id}");
        }

        if logql.len() > max_size {
            return Err(CoreError::QueryTooLong {
                size: logql.len(),
                max: max_size,
            });
        }
        Ok(logql)
    }
}

/// Double-quote a LogQL string literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ── Time window ──────────────────────────────────────────────────────

/// Half-open `[from, to)` window in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: i64,
    pub to: i64,
}

impl TimeWindow {
    /// Resolve optional query bounds against `now`.
    ///
    /// A missing (or zero) `to` means now; a missing `from` means
    /// `default_range` before `to`.
    pub fn resolve(
        from: Option<i64>,
        to: Option<i64>,
        now: DateTime<Utc>,
        default_range: Duration,
    ) -> Result<Self, CoreError> {
        let to = to.filter(|&t| t != 0).unwrap_or_else(|| now.timestamp_millis());
        let range_ms = i64::try_from(default_range.as_millis()).unwrap_or(i64::MAX);
        let from = from
            .filter(|&f| f != 0)
            .unwrap_or_else(|| to.saturating_sub(range_ms));

        if from > to {
            return Err(CoreError::InvalidTimeRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Inclusive lower bound in nanoseconds.
    pub fn start_ns(&self) -> i64 {
        self.from.saturating_mul(NANOS_PER_MILLI)
    }

    /// Exclusive upper bound in nanoseconds.
    pub fn end_ns(&self) -> i64 {
        self.to.saturating_mul(NANOS_PER_MILLI)
    }

    /// Whether a nanosecond timestamp lies inside the window.
    pub fn contains_ns(&self, timestamp_ns: i64) -> bool {
        timestamp_ns >= self.start_ns() && timestamp_ns < self.end_ns()
    }
}
