// ── Loki historian annotation store ──
//
// Serves annotation reads from alert state history. One `get` performs at
// most one rule lookup, one dashboard lookup and one Loki range query, in
// that order, then decodes, filters and sorts the returned entries.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use statehist_api::{Sample, Stream};

use crate::access::has_access;
use crate::codec::decode_sample;
use crate::config::StoreOptions;
use crate::error::CoreError;
use crate::lookup::{DashboardLookup, RangeQuery, RuleLookup};
use crate::model::{AccessResources, AnnotationItem, ItemQuery};
use crate::query::{TimeWindow, build_history_query};

/// Annotation store backed by Loki state history.
///
/// Holds no mutable state; share it behind an `Arc` across callers.
pub struct HistorianStore {
    client: Arc<dyn RangeQuery>,
    rules: Arc<dyn RuleLookup>,
    dashboards: Arc<dyn DashboardLookup>,
    options: StoreOptions,
}

impl HistorianStore {
    pub fn new(
        client: Arc<dyn RangeQuery>,
        rules: Arc<dyn RuleLookup>,
        dashboards: Arc<dyn DashboardLookup>,
        options: StoreOptions,
    ) -> Self {
        Self {
            client,
            rules,
            dashboards,
            options,
        }
    }

    /// Fetch the alert state annotations matching `query` that the caller
    /// described by `resources` may see, most recent first.
    ///
    /// Lookup and backend failures abort the query. Entries that fail to
    /// decode or are not visible to the caller are dropped. Cancelling
    /// `cancel` abandons any in-flight call and returns
    /// [`CoreError::Cancelled`].
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        query: &ItemQuery,
        resources: &AccessResources,
    ) -> Result<Vec<AnnotationItem>, CoreError> {
        if query.is_foreign_type() {
            trace!(kind = ?query.kind, "not an alert annotation query, skipping loki");
            return Ok(Vec::new());
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            result = self.fetch(query, resources) => result,
        }
    }

    async fn fetch(
        &self,
        query: &ItemQuery,
        resources: &AccessResources,
    ) -> Result<Vec<AnnotationItem>, CoreError> {
        let rule_uid = match query.alert_id() {
            Some(rule_id) => {
                let rule = self
                    .rules
                    .get_rule(query.org_id, rule_id)
                    .await?
                    .ok_or(CoreError::RuleNotFound {
                        org_id: query.org_id,
                        rule_id,
                    })?;
                debug!(
                    org_id = query.org_id,
                    rule_id,
                    rule_uid = %rule.uid,
                    dashboard_uid = ?rule.dashboard_uid,
                    "resolved alert rule"
                );
                Some(rule.uid)
            }
            None => None,
        };

        let dashboards = self.dashboards_for(query, resources).await?;
        let window = TimeWindow::resolve(
            query.from,
            query.to,
            Utc::now(),
            self.options.default_query_range,
        )?;

        let history =
            build_history_query(query, &dashboards, rule_uid.as_deref()).with_window(window);
        let logql = history.to_logql(self.options.max_query_size)?;

        let streams = self
            .client
            .range_query(
                &logql,
                window.start_ns(),
                window.end_ns(),
                query.limit.unwrap_or_default(),
            )
            .await?;

        let mut items = Vec::new();
        let mut skipped = 0;
        for stream in &streams {
            let (mut stream_items, stream_skipped) =
                annotations_from_stream(stream, window, resources);
            items.append(&mut stream_items);
            skipped += stream_skipped;
        }
        items.sort_by_key(|item| Reverse(item.time));

        debug!(
            org_id = query.org_id,
            query = %logql,
            streams = streams.len(),
            items = items.len(),
            skipped,
            "state history query complete"
        );
        Ok(items)
    }

    /// The caller's dashboard map, extended with the queried dashboard
    /// when it is not already present.
    async fn dashboards_for<'a>(
        &self,
        query: &ItemQuery,
        resources: &'a AccessResources,
    ) -> Result<Cow<'a, HashMap<String, i64>>, CoreError> {
        let explicit_uid = query.dashboard_uid.as_deref().is_some_and(|uid| !uid.is_empty());
        let Some(id) = query.dashboard_id().filter(|_| !explicit_uid) else {
            return Ok(Cow::Borrowed(&resources.dashboards));
        };
        if resources.dashboards.values().any(|&known| known == id) {
            return Ok(Cow::Borrowed(&resources.dashboards));
        }

        match self.dashboards.dashboard_uid(query.org_id, id).await? {
            Some(uid) => {
                trace!(dashboard_id = id, dashboard_uid = %uid, "resolved dashboard uid");
                let mut dashboards = resources.dashboards.clone();
                dashboards.insert(uid, id);
                Ok(Cow::Owned(dashboards))
            }
            None => Ok(Cow::Borrowed(&resources.dashboards)),
        }
    }
}

/// Turn one stream into annotation items.
///
/// Each item's previous state is the formatted state of the
/// chronologically preceding decoded entry in the stream, not the entry's
/// self-reported previous state. Samples are folded oldest first whatever
/// order Loki returned them in. Entries hidden by the access filter still
/// advance that chain; entries outside `window` or that fail to decode do
/// not. Returns the items and the number of entries that failed to decode.
pub fn annotations_from_stream(
    stream: &Stream,
    window: TimeWindow,
    resources: &AccessResources,
) -> (Vec<AnnotationItem>, usize) {
    let mut samples: Vec<&Sample> = stream
        .values
        .iter()
        .filter(|sample| window.contains_ns(sample.timestamp_ns))
        .collect();
    samples.sort_by_key(|sample| sample.timestamp_ns);

    let mut items = Vec::with_capacity(samples.len());
    let mut skipped = 0;
    let mut last_state: Option<String> = None;

    for sample in samples {
        let (entry, transition) = match decode_sample(sample) {
            Ok(decoded) => decoded,
            Err(e) => {
                debug!(
                    error = %e,
                    timestamp = sample.timestamp_ns,
                    "skipping undecodable state history entry"
                );
                skipped += 1;
                continue;
            }
        };

        let new_state = transition.formatted();
        let prev_state = last_state.replace(new_state.clone()).unwrap_or_default();

        if !has_access(&entry, resources) {
            continue;
        }

        let (dashboard_id, dashboard_uid) = if entry.dashboard_uid.is_empty() {
            (0, None)
        } else {
            (
                resources
                    .dashboards
                    .get(&entry.dashboard_uid)
                    .copied()
                    .unwrap_or_default(),
                Some(entry.dashboard_uid),
            )
        };

        items.push(AnnotationItem {
            alert_id: entry.rule_id,
            alert_name: entry.rule_title,
            dashboard_id,
            dashboard_uid,
            panel_id: entry.panel_id,
            time: sample.timestamp_millis(),
            new_state,
            prev_state,
            text: String::new(),
            data: None,
        });
    }

    (items, skipped)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use statehist_api::LokiEntry;

    use super::*;
    use crate::lookup::{DashboardRef, StaticCatalog};
    use crate::model::RuleMeta;

    const T0: i64 = 1_700_000_000_000;
    const SECOND: i64 = 1000;

    // ── Fakes ──

    /// Loki double that serves canned streams, honouring `[start, end)`
    /// at nanosecond granularity like the real query_range endpoint.
    #[derive(Default)]
    struct FakeLokiClient {
        response: Mutex<Vec<Stream>>,
        failure: Mutex<Option<statehist_api::Error>>,
        calls: AtomicUsize,
        last_request: Mutex<Option<(String, i64, i64, i64)>>,
    }

    impl FakeLokiClient {
        fn with_streams(streams: Vec<Stream>) -> Arc<Self> {
            let fake = Self::default();
            *fake.response.lock().unwrap() = streams;
            Arc::new(fake)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_query(&self) -> String {
            self.last_request.lock().unwrap().clone().unwrap().0
        }
    }

    #[async_trait]
    impl RangeQuery for FakeLokiClient {
        async fn range_query(
            &self,
            logql: &str,
            start_ns: i64,
            end_ns: i64,
            limit: i64,
        ) -> Result<Vec<Stream>, statehist_api::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((logql.to_owned(), start_ns, end_ns, limit));
            if let Some(err) = self.failure.lock().unwrap().take() {
                return Err(err);
            }

            let streams = self.response.lock().unwrap().clone();
            Ok(streams
                .into_iter()
                .map(|stream| Stream {
                    values: stream
                        .values
                        .into_iter()
                        .filter(|s| s.timestamp_ns >= start_ns && s.timestamp_ns < end_ns)
                        .collect(),
                    ..stream
                })
                .collect())
        }
    }

    /// Range query that never completes.
    struct PendingLoki;

    #[async_trait]
    impl RangeQuery for PendingLoki {
        async fn range_query(
            &self,
            _logql: &str,
            _start_ns: i64,
            _end_ns: i64,
            _limit: i64,
        ) -> Result<Vec<Stream>, statehist_api::Error> {
            std::future::pending().await
        }
    }

    // ── Helpers ──

    fn catalog() -> Arc<StaticCatalog> {
        Arc::new(StaticCatalog::new(
            [
                rule(1, "rule-1", "dash-1"),
                rule(2, "rule-2", "dash-1"),
                rule(3, "rule-3", "dash-2"),
            ],
            [
                DashboardRef {
                    org_id: 1,
                    id: 100,
                    uid: "dash-1".into(),
                    title: "Dashboard 1".into(),
                },
                DashboardRef {
                    org_id: 1,
                    id: 200,
                    uid: "dash-2".into(),
                    title: "Dashboard 2".into(),
                },
            ],
        ))
    }

    fn rule(id: i64, uid: &str, dashboard_uid: &str) -> RuleMeta {
        RuleMeta {
            org_id: 1,
            uid: uid.into(),
            id,
            title: format!("Test Rule {id}"),
            dashboard_uid: Some(dashboard_uid.into()),
            panel_id: Some(1),
        }
    }

    fn store(client: Arc<dyn RangeQuery>) -> HistorianStore {
        let catalog = catalog();
        HistorianStore::new(client, catalog.clone(), catalog, StoreOptions::default())
    }

    fn sample_at(millis: i64, rule: &RuleMeta, current: &str, previous: &str) -> Sample {
        let entry = LokiEntry {
            schema_version: 1,
            previous: previous.into(),
            current: current.into(),
            values: Some(json!({ "A": 1.0 })),
            dashboard_uid: rule.dashboard_uid.clone().unwrap_or_default(),
            panel_id: rule.panel_id.unwrap_or_default(),
            rule_title: rule.title.clone(),
            rule_id: rule.id,
            rule_uid: rule.uid.clone(),
            ..LokiEntry::default()
        };
        Sample::new(millis * 1_000_000, serde_json::to_string(&entry).unwrap())
    }

    /// `count` transitions one second apart starting at `start`,
    /// alternating Alerting / Normal.
    fn transitions(rule: &RuleMeta, start: i64, count: i64) -> Stream {
        let values = (0..count)
            .map(|i| {
                let (current, previous) = if i % 2 == 0 {
                    ("Alerting", "Normal")
                } else {
                    ("Normal", "Alerting")
                };
                sample_at(start + i * SECOND, rule, current, previous)
            })
            .collect();
        Stream {
            stream: HashMap::from([
                ("orgID".to_owned(), "1".to_owned()),
                ("from".to_owned(), "state-history".to_owned()),
            ]),
            values,
        }
    }

    fn dash_access(dashboards: &[(&str, i64)]) -> AccessResources {
        AccessResources {
            dashboards: dashboards
                .iter()
                .map(|(uid, id)| ((*uid).to_owned(), *id))
                .collect(),
            can_access_org_annotations: false,
            can_access_dash_annotations: true,
        }
    }

    fn window_query(from: i64, to: i64) -> ItemQuery {
        ItemQuery {
            org_id: 1,
            from: Some(from),
            to: Some(to),
            ..ItemQuery::default()
        }
    }

    // ── Queries ──

    #[tokio::test]
    async fn query_by_alert_id() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
        ]);
        let store = store(fake.clone());

        let query = ItemQuery {
            alert_id: Some(1),
            ..window_query(T0, T0 + 3 * SECOND)
        };
        let res = store
            .get(&CancellationToken::new(), &query, &dash_access(&[("dash-1", 100)]))
            .await
            .unwrap();

        assert_eq!(res.len(), 2);
        assert!(fake.last_query().contains(r#"| ruleUID="rule-1""#));
        assert!(res.iter().all(|item| item.alert_id == 1 && item.alert_name == "Test Rule 1"));
    }

    #[tokio::test]
    async fn unknown_alert_id_fails_before_querying() {
        let fake = FakeLokiClient::with_streams(Vec::new());
        let store = store(fake.clone());

        let query = ItemQuery {
            alert_id: Some(999),
            ..window_query(T0, T0 + SECOND)
        };
        let err = store
            .get(&CancellationToken::new(), &query, &dash_access(&[]))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::RuleNotFound { org_id: 1, rule_id: 999 }));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn query_by_dashboard_id() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
            transitions(&rule(2, "rule-2", "dash-1"), T0, 2),
        ]);
        let store = store(fake.clone());

        let query = ItemQuery {
            dashboard_id: Some(100),
            ..window_query(T0, T0 + 3 * SECOND)
        };
        let res = store
            .get(&CancellationToken::new(), &query, &dash_access(&[("dash-1", 100)]))
            .await
            .unwrap();

        assert_eq!(res.len(), 4);
        assert!(fake.last_query().contains(r#"| dashboardUID="dash-1""#));
        assert!(res.iter().all(|item| item.dashboard_id == 100));
    }

    #[tokio::test]
    async fn dashboard_outside_access_map_is_resolved_through_lookup() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(3, "rule-3", "dash-2"), T0, 2),
        ]);
        let store = store(fake.clone());

        let query = ItemQuery {
            dashboard_id: Some(200),
            ..window_query(T0, T0 + 3 * SECOND)
        };
        let res = store
            .get(&CancellationToken::new(), &query, &dash_access(&[("dash-1", 100)]))
            .await
            .unwrap();

        assert!(fake.last_query().contains(r#"| dashboardUID="dash-2""#));
        // The caller still may not see dash-2 entries.
        assert!(res.is_empty());
    }

    #[tokio::test]
    async fn time_window_is_half_open() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
        ]);
        let store = store(fake);
        let access = dash_access(&[("dash-1", 100)]);
        let cancel = CancellationToken::new();

        let res = store.get(&cancel, &window_query(T0, T0 + 3 * SECOND), &access).await.unwrap();
        assert_eq!(res.len(), 2);

        let res = store
            .get(&cancel, &window_query(T0 - 2 * SECOND, T0 - SECOND), &access)
            .await
            .unwrap();
        assert!(res.is_empty());

        // `to` is exclusive, `from` inclusive.
        let res = store.get(&cancel, &window_query(T0, T0 + SECOND), &access).await.unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].time, T0);
    }

    #[tokio::test]
    async fn foreign_annotation_type_skips_loki() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
        ]);
        let store = store(fake.clone());

        let query = ItemQuery {
            kind: Some("annotation".into()),
            ..window_query(T0, T0 + 3 * SECOND)
        };
        let res = store
            .get(&CancellationToken::new(), &query, &dash_access(&[("dash-1", 100)]))
            .await
            .unwrap();

        assert!(res.is_empty());
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn alert_type_is_served() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 1),
        ]);
        let store = store(fake.clone());

        let query = ItemQuery {
            kind: Some("alert".into()),
            ..window_query(T0, T0 + SECOND)
        };
        let res = store
            .get(&CancellationToken::new(), &query, &dash_access(&[("dash-1", 100)]))
            .await
            .unwrap();
        assert_eq!(res.len(), 1);
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn results_are_sorted_most_recent_first() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
            transitions(&rule(2, "rule-2", "dash-1"), T0 + 500, 2),
            transitions(&rule(3, "rule-3", "dash-1"), T0 - 500, 2),
        ]);
        let store = store(fake);

        let res = store
            .get(
                &CancellationToken::new(),
                &window_query(T0 - SECOND, T0 + 3 * SECOND),
                &dash_access(&[("dash-1", 100)]),
            )
            .await
            .unwrap();

        let times: Vec<i64> = res.iter().map(|item| item.time).collect();
        assert_eq!(
            times,
            vec![T0 + 1500, T0 + 1000, T0 + 500, T0 + 500, T0, T0 - 500]
        );
    }

    #[tokio::test]
    async fn only_permitted_dashboards_are_returned() {
        let fake = FakeLokiClient::with_streams(vec![
            transitions(&rule(1, "rule-1", "dash-1"), T0, 2),
            transitions(&rule(3, "rule-3", "dash-2"), T0, 2),
        ]);
        let store = store(fake);

        let res = store
            .get(
                &CancellationToken::new(),
                &window_query(T0, T0 + 3 * SECOND),
                &dash_access(&[("dash-1", 100)]),
            )
            .await
            .unwrap();

        assert_eq!(res.len(), 2);
        for item in &res {
            assert_eq!(item.dashboard_uid.as_deref(), Some("dash-1"));
            assert_eq!(item.dashboard_id, 100);
        }
    }

    #[tokio::test]
    async fn organization_scope_needs_org_access() {
        let org_rule = RuleMeta {
            dashboard_uid: None,
            panel_id: None,
            ..rule(1, "rule-1", "")
        };
        let fake = FakeLokiClient::with_streams(vec![transitions(&org_rule, T0, 2)]);
        let store = store(fake);
        let cancel = CancellationToken::new();
        let query = window_query(T0, T0 + 3 * SECOND);

        let res = store.get(&cancel, &query, &dash_access(&[("dash-1", 100)])).await.unwrap();
        assert!(res.is_empty());

        let org_access = AccessResources {
            can_access_org_annotations: true,
            ..AccessResources::default()
        };
        let res = store.get(&cancel, &query, &org_access).await.unwrap();
        assert_eq!(res.len(), 2);
        assert!(res.iter().all(|item| item.dashboard_uid.is_none() && item.dashboard_id == 0));
    }

    #[tokio::test]
    async fn backend_failure_aborts_query() {
        let fake = FakeLokiClient::with_streams(Vec::new());
        *fake.failure.lock().unwrap() = Some(statehist_api::Error::Loki {
            status: 500,
            body: "internal".into(),
        });
        let store = store(fake);

        let err = store
            .get(&CancellationToken::new(), &window_query(T0, T0 + SECOND), &dash_access(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Backend { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn cancellation_abandons_backend_call() {
        let store = store(Arc::new(PendingLoki));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .get(&cancel, &window_query(T0, T0 + SECOND), &dash_access(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }

    #[tokio::test]
    async fn missing_bounds_default_to_lookback_window() {
        let fake = FakeLokiClient::with_streams(Vec::new());
        let store = store(fake.clone());

        store
            .get(
                &CancellationToken::new(),
                &ItemQuery {
                    org_id: 1,
                    ..ItemQuery::default()
                },
                &dash_access(&[]),
            )
            .await
            .unwrap();

        let (_, start, end, limit) = fake.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(end - start, 6 * 3600 * 1_000_000_000);
        assert_eq!(limit, 0);
    }

    #[tokio::test]
    async fn inverted_bounds_are_rejected() {
        let fake = FakeLokiClient::with_streams(Vec::new());
        let store = store(fake.clone());

        let err = store
            .get(&CancellationToken::new(), &window_query(T0, T0 - 1), &dash_access(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeRange { .. }));
        assert_eq!(fake.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_query_is_rejected() {
        let fake = FakeLokiClient::with_streams(Vec::new());
        let catalog = catalog();
        let store = HistorianStore::new(
            fake.clone(),
            catalog.clone(),
            catalog,
            StoreOptions {
                max_query_size: 16,
                ..StoreOptions::default()
            },
        );

        let err = store
            .get(&CancellationToken::new(), &window_query(T0, T0 + SECOND), &dash_access(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::QueryTooLong { max: 16, .. }));
        assert_eq!(fake.calls(), 0);
    }

    // ── annotations_from_stream ──

    #[test]
    fn previous_state_follows_stream_order() {
        let r = rule(1, "rule-1", "dash-1");
        let stream = Stream {
            stream: HashMap::new(),
            values: vec![
                sample_at(T0, &r, "Pending", "Error (NoData)"),
                sample_at(T0 + SECOND, &r, "Alerting", "Normal"),
                sample_at(T0 + 2 * SECOND, &r, "Normal (MissingSeries)", "Pending"),
            ],
        };

        let (items, skipped) = annotations_from_stream(
            &stream,
            TimeWindow { from: T0, to: T0 + 3 * SECOND },
            &dash_access(&[("dash-1", 100)]),
        );

        assert_eq!(skipped, 0);
        let states: Vec<(&str, &str)> = items
            .iter()
            .map(|item| (item.prev_state.as_str(), item.new_state.as_str()))
            .collect();
        assert_eq!(
            states,
            vec![
                ("", "Pending"),
                ("Pending", "Alerting"),
                ("Alerting", "Normal (MissingSeries)"),
            ]
        );
    }

    #[test]
    fn previous_state_is_chronological_for_newest_first_streams() {
        let r = rule(1, "rule-1", "dash-1");
        let stream = Stream {
            stream: HashMap::new(),
            values: vec![
                sample_at(T0 + 2 * SECOND, &r, "Normal", "Alerting"),
                sample_at(T0 + SECOND, &r, "Alerting", "Pending"),
                sample_at(T0, &r, "Pending", "Normal"),
            ],
        };

        let (items, _) = annotations_from_stream(
            &stream,
            TimeWindow { from: T0, to: T0 + 3 * SECOND },
            &dash_access(&[("dash-1", 100)]),
        );

        let states: Vec<(i64, &str, &str)> = items
            .iter()
            .map(|item| (item.time, item.prev_state.as_str(), item.new_state.as_str()))
            .collect();
        assert_eq!(
            states,
            vec![
                (T0, "", "Pending"),
                (T0 + SECOND, "Pending", "Alerting"),
                (T0 + 2 * SECOND, "Alerting", "Normal"),
            ]
        );
    }

    #[tokio::test]
    async fn newest_first_backend_keeps_previous_state_order() {
        let mut stream = transitions(&rule(1, "rule-1", "dash-1"), T0, 3);
        stream.values.reverse();
        let store = store(FakeLokiClient::with_streams(vec![stream]));

        let res = store
            .get(
                &CancellationToken::new(),
                &window_query(T0, T0 + 3 * SECOND),
                &dash_access(&[("dash-1", 100)]),
            )
            .await
            .unwrap();

        let states: Vec<(i64, &str)> = res
            .iter()
            .map(|item| (item.time, item.prev_state.as_str()))
            .collect();
        assert_eq!(
            states,
            vec![
                (T0 + 2 * SECOND, "Normal"),
                (T0 + SECOND, "Alerting"),
                (T0, ""),
            ]
        );
    }

    #[test]
    fn undecodable_entries_are_skipped() {
        let r = rule(1, "rule-1", "dash-1");
        let stream = Stream {
            stream: HashMap::new(),
            values: vec![
                sample_at(T0, &r, "Alerting", ""),
                Sample::new((T0 + SECOND) * 1_000_000, "{not json"),
                sample_at(T0 + 2 * SECOND, &r, "Bogus", "Alerting"),
                sample_at(T0 + 3 * SECOND, &r, "Normal", "Alerting"),
            ],
        };

        let (items, skipped) = annotations_from_stream(
            &stream,
            TimeWindow { from: T0, to: T0 + 4 * SECOND },
            &dash_access(&[("dash-1", 100)]),
        );

        assert_eq!(skipped, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].prev_state, "Alerting");
        assert_eq!(items[1].new_state, "Normal");
    }

    #[test]
    fn hidden_entries_still_advance_previous_state() {
        let visible = rule(1, "rule-1", "dash-1");
        let hidden = rule(3, "rule-3", "dash-2");
        let stream = Stream {
            stream: HashMap::new(),
            values: vec![
                sample_at(T0, &hidden, "Alerting", ""),
                sample_at(T0 + SECOND, &visible, "Normal", "Alerting"),
            ],
        };

        let (items, _) = annotations_from_stream(
            &stream,
            TimeWindow { from: T0, to: T0 + 2 * SECOND },
            &dash_access(&[("dash-1", 100)]),
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].prev_state, "Alerting");
        assert_eq!(items[0].panel_id, 1);
        assert!(items[0].text.is_empty());
        assert!(items[0].data.is_none());
    }
}
