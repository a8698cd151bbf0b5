// ── Collaborator traits ──
//
// Narrow async interfaces the history store reads through: the Loki range
// query, the alert rule store and the dashboard store. `StaticCatalog` is
// an in-memory implementation of both lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use statehist_api::{LokiClient, Stream};

use crate::model::RuleMeta;

/// Failure to resolve a rule or dashboard.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Rule lookup failed: {message}")]
    Rule { message: String },

    #[error("Dashboard lookup failed: {message}")]
    Dashboard { message: String },
}

/// Range query against the state history log store.
#[async_trait]
pub trait RangeQuery: Send + Sync {
    /// Fetch streams with entries in `[start_ns, end_ns)`.
    ///
    /// `limit` below 1 means the backend default.
    async fn range_query(
        &self,
        logql: &str,
        start_ns: i64,
        end_ns: i64,
        limit: i64,
    ) -> Result<Vec<Stream>, statehist_api::Error>;
}

/// Alert rule metadata by numeric id.
#[async_trait]
pub trait RuleLookup: Send + Sync {
    /// `Ok(None)` when no rule with that id exists in the org.
    async fn get_rule(&self, org_id: i64, rule_id: i64) -> Result<Option<RuleMeta>, LookupError>;
}

/// Dashboard UID by numeric id.
#[async_trait]
pub trait DashboardLookup: Send + Sync {
    /// `Ok(None)` when no dashboard with that id exists in the org.
    async fn dashboard_uid(&self, org_id: i64, id: i64) -> Result<Option<String>, LookupError>;
}

#[async_trait]
impl RangeQuery for LokiClient {
    async fn range_query(
        &self,
        logql: &str,
        start_ns: i64,
        end_ns: i64,
        limit: i64,
    ) -> Result<Vec<Stream>, statehist_api::Error> {
        let response = LokiClient::range_query(self, logql, start_ns, end_ns, limit).await?;
        Ok(response.data.result)
    }
}

// ── StaticCatalog ────────────────────────────────────────────────────

/// A dashboard known to a [`StaticCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardRef {
    pub org_id: i64,
    pub id: i64,
    pub uid: String,
    #[serde(default)]
    pub title: String,
}

/// Fixed in-memory rules and dashboards, keyed by `(org_id, id)`.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    rules: HashMap<(i64, i64), RuleMeta>,
    dashboards: HashMap<(i64, i64), DashboardRef>,
}

impl StaticCatalog {
    pub fn new(
        rules: impl IntoIterator<Item = RuleMeta>,
        dashboards: impl IntoIterator<Item = DashboardRef>,
    ) -> Self {
        Self {
            rules: rules.into_iter().map(|r| ((r.org_id, r.id), r)).collect(),
            dashboards: dashboards
                .into_iter()
                .map(|d| ((d.org_id, d.id), d))
                .collect(),
        }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn dashboard_count(&self) -> usize {
        self.dashboards.len()
    }
}

#[async_trait]
impl RuleLookup for StaticCatalog {
    async fn get_rule(&self, org_id: i64, rule_id: i64) -> Result<Option<RuleMeta>, LookupError> {
        Ok(self.rules.get(&(org_id, rule_id)).cloned())
    }
}

#[async_trait]
impl DashboardLookup for StaticCatalog {
    async fn dashboard_uid(&self, org_id: i64, id: i64) -> Result<Option<String>, LookupError> {
        Ok(self.dashboards.get(&(org_id, id)).map(|d| d.uid.clone()))
    }
}
