// Loki query response and state-history log line types
//
// Models for `GET /loki/api/v1/query_range` responses plus the JSON payload
// the alert state historian writes into each log line. Fields use
// `#[serde(default)]` liberally because log lines may come from several
// writer versions.

use std::collections::HashMap;
use std::num::ParseIntError;

use serde::{Deserialize, Serialize};

// ── Stream labels ────────────────────────────────────────────────────

/// Stream label holding the organization id.
pub const ORG_ID_LABEL: &str = "orgID";
/// Stream label marking a stream as alert state history.
pub const STATE_HISTORY_LABEL_KEY: &str = "from";
/// Value of [`STATE_HISTORY_LABEL_KEY`] on state history streams.
pub const STATE_HISTORY_LABEL_VALUE: &str = "state-history";
/// Stream label holding the rule group name.
pub const GROUP_LABEL: &str = "group";
/// Stream label holding the folder UID of the rule.
pub const FOLDER_UID_LABEL: &str = "folderUID";

// ── Response Envelope ────────────────────────────────────────────────

/// Body of a `query_range` response.
///
/// ```json
/// { "status": "success", "data": { "resultType": "streams", "result": [...] } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub data: QueryData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(default, rename = "resultType")]
    pub result_type: Option<String>,
    #[serde(default)]
    pub result: Vec<Stream>,
}

// ── Streams ──────────────────────────────────────────────────────────

/// A sequence of timestamped log lines sharing one set of static labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// Static stream labels (`orgID`, `from`, `group`, `folderUID`, ...).
    #[serde(default)]
    pub stream: HashMap<String, String>,
    /// Entries in the order Loki returned them.
    #[serde(default)]
    pub values: Vec<Sample>,
}

/// One log line in a stream.
///
/// On the wire a sample is a two-element array of strings:
/// `["<unix nanos>", "<line>"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSample", into = "RawSample")]
pub struct Sample {
    /// Timestamp in nanoseconds since the Unix epoch.
    pub timestamp_ns: i64,
    /// Raw log line (JSON-encoded [`LokiEntry`] for state history).
    pub line: String,
}

impl Sample {
    pub fn new(timestamp_ns: i64, line: impl Into<String>) -> Self {
        Self {
            timestamp_ns,
            line: line.into(),
        }
    }

    /// Timestamp truncated to milliseconds.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_ns.div_euclid(1_000_000)
    }
}

#[derive(Serialize, Deserialize)]
struct RawSample(String, String);

impl TryFrom<RawSample> for Sample {
    type Error = ParseIntError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        Ok(Self {
            timestamp_ns: raw.0.parse()?,
            line: raw.1,
        })
    }
}

impl From<Sample> for RawSample {
    fn from(s: Sample) -> Self {
        Self(s.timestamp_ns.to_string(), s.line)
    }
}

// ── State history log line ───────────────────────────────────────────

/// JSON payload of a single state history log line.
///
/// `values` stays loosely typed: writers emit numbers, but older lines may
/// carry strings or nulls, so validation happens in the core codec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LokiEntry {
    #[serde(default)]
    pub schema_version: i32,
    #[serde(default)]
    pub previous: String,
    #[serde(default)]
    pub current: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default)]
    pub values: Option<serde_json::Value>,
    #[serde(default)]
    pub condition: String,
    #[serde(default, rename = "dashboardUID")]
    pub dashboard_uid: String,
    #[serde(default, rename = "panelID")]
    pub panel_id: i64,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub rule_title: String,
    #[serde(default, rename = "ruleID")]
    pub rule_id: i64,
    #[serde(default, rename = "ruleUID")]
    pub rule_uid: String,
    /// Labels of the alert instance (not the stream labels).
    #[serde(default, rename = "labels")]
    pub instance_labels: HashMap<String, String>,
}
