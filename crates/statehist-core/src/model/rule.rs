// ── Alert rule metadata ──

use serde::{Deserialize, Serialize};

/// The slice of an alert rule the history store needs.
///
/// Supplied by a [`RuleLookup`](crate::lookup::RuleLookup); the rule store
/// itself lives outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMeta {
    pub org_id: i64,
    pub uid: String,
    pub id: i64,
    #[serde(default)]
    pub title: String,
    /// Dashboard the rule is linked to, if any.
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: Option<i64>,
}
