// ── Runtime history configuration ──
//
// These types describe which state history backend a deployment runs and
// how the store queries it. They never touch disk: the config crate (or
// an embedding service) builds them and hands them in.

use std::collections::HashSet;
use std::time::Duration;

/// Feature flag: Loki is the only state history backend.
pub const FLAG_LOKI_ONLY: &str = "alertStateHistoryLokiOnly";
/// Feature flag: Loki is the primary state history backend.
pub const FLAG_LOKI_PRIMARY: &str = "alertStateHistoryLokiPrimary";
/// Feature flag: Loki receives a secondary copy of state history.
pub const FLAG_LOKI_SECONDARY: &str = "alertStateHistoryLokiSecondary";

/// Default cap on rendered LogQL length, in bytes.
pub const DEFAULT_MAX_QUERY_SIZE: usize = 65_536;
/// Window used when a query has no lower bound.
pub const DEFAULT_QUERY_RANGE: Duration = Duration::from_secs(6 * 60 * 60);

/// State history backend selection, as configured.
///
/// Backend names are kept as raw strings; they are validated by
/// [`use_store`](crate::eligibility::use_store).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySettings {
    pub enabled: bool,
    pub backend: String,
    /// Primary backend when `backend` is `multiple`.
    pub multi_primary: String,
    /// Secondary backends when `backend` is `multiple`.
    pub multi_secondaries: Vec<String>,
}

/// Globally enabled feature flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureToggles {
    enabled: HashSet<String>,
}

impl FeatureToggles {
    pub fn new<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: flags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_enabled(&self, flag: &str) -> bool {
        self.enabled.contains(flag)
    }
}

/// Query tuning for [`HistorianStore`](crate::store::HistorianStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Longest LogQL query sent to Loki, in bytes.
    pub max_query_size: usize,
    /// Lookback used when a query has no `from`.
    pub default_query_range: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_query_size: DEFAULT_MAX_QUERY_SIZE,
            default_query_range: DEFAULT_QUERY_RANGE,
        }
    }
}
