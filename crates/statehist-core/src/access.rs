// ── Access filter ──
//
// Per-entry visibility check. Entries without a dashboard are
// organization-scoped; entries with one need dashboard-scope permission
// and the dashboard in the caller's permitted set.

use statehist_api::LokiEntry;

use crate::model::AccessResources;

/// Whether the caller described by `resources` may see `entry`.
pub fn has_access(entry: &LokiEntry, resources: &AccessResources) -> bool {
    if entry.dashboard_uid.is_empty() {
        return resources.can_access_org_annotations;
    }
    resources.can_access_dash_annotations && resources.dashboards.contains_key(&entry.dashboard_uid)
}
