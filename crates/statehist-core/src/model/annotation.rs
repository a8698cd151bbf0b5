// ── Annotation query and result types ──
//
// The generic annotation surface: what callers ask for (`ItemQuery`),
// what they may see (`AccessResources`) and what they get back
// (`AnnotationItem`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Annotation type served by this store. Any other non-empty type filter
/// names a foreign annotation kind and yields no results.
pub const ALERT_ANNOTATION_TYPE: &str = "alert";

/// A generic annotation query.
///
/// Identifier fields treat `Some(0)` the same as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuery {
    pub org_id: i64,
    pub alert_id: Option<i64>,
    pub dashboard_id: Option<i64>,
    /// Explicit dashboard UID; takes precedence over `dashboard_id`.
    pub dashboard_uid: Option<String>,
    pub panel_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Inclusive lower bound, Unix milliseconds.
    pub from: Option<i64>,
    /// Exclusive upper bound, Unix milliseconds.
    pub to: Option<i64>,
    /// Maximum entries requested from the backend.
    pub limit: Option<i64>,
}

impl ItemQuery {
    pub fn alert_id(&self) -> Option<i64> {
        self.alert_id.filter(|&id| id != 0)
    }

    pub fn dashboard_id(&self) -> Option<i64> {
        self.dashboard_id.filter(|&id| id != 0)
    }

    pub fn panel_id(&self) -> Option<i64> {
        self.panel_id.filter(|&id| id != 0)
    }

    /// `true` when the type filter names an annotation kind other than
    /// alert state history.
    pub fn is_foreign_type(&self) -> bool {
        self.kind
            .as_deref()
            .is_some_and(|kind| !kind.is_empty() && kind != ALERT_ANNOTATION_TYPE)
    }
}

/// What the caller is allowed to see, resolved per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResources {
    /// Dashboard UID -> dashboard id for every dashboard the caller may read.
    #[serde(default)]
    pub dashboards: HashMap<String, i64>,
    /// Organization-scoped annotations (no linked dashboard) are visible.
    #[serde(default)]
    pub can_access_org_annotations: bool,
    /// Dashboard-scoped annotations are visible for dashboards in `dashboards`.
    #[serde(default)]
    pub can_access_dash_annotations: bool,
}

/// One annotation, derived from one state history log line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationItem {
    pub alert_id: i64,
    pub alert_name: String,
    pub dashboard_id: i64,
    /// `None` for organization-scoped annotations.
    pub dashboard_uid: Option<String>,
    pub panel_id: i64,
    /// Unix milliseconds.
    pub time: i64,
    pub new_state: String,
    pub prev_state: String,
    pub text: String,
    pub data: Option<serde_json::Value>,
}
