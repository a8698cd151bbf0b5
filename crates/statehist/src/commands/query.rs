//! `statehist query`: annotation reads through the historian store.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use tabled::Tabled;
use tracing::{debug, warn};

use statehist_api::LokiClient;
use statehist_config::Config;
use statehist_core::{
    AnnotationItem, CancellationToken, CoreError, HistorianStore, ItemQuery, use_store,
};

use crate::cli::{GlobalOpts, QueryArgs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AnnotationRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Alert")]
    alert: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Dashboard")]
    dashboard: String,
    #[tabled(rename = "Panel")]
    panel: String,
    #[tabled(rename = "Previous")]
    previous: String,
    #[tabled(rename = "New")]
    new: String,
}

impl From<&AnnotationItem> for AnnotationRow {
    fn from(item: &AnnotationItem) -> Self {
        Self {
            time: DateTime::from_timestamp_millis(item.time)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
                .unwrap_or_else(|| item.time.to_string()),
            alert: item.alert_id.to_string(),
            name: item.alert_name.clone(),
            dashboard: item.dashboard_uid.clone().unwrap_or_else(|| "-".into()),
            panel: if item.panel_id == 0 {
                String::new()
            } else {
                item.panel_id.to_string()
            },
            previous: item.prev_state.clone(),
            new: item.new_state.clone(),
        }
    }
}

impl From<&QueryArgs> for ItemQuery {
    fn from(args: &QueryArgs) -> Self {
        Self {
            org_id: args.org,
            alert_id: args.alert_id,
            dashboard_id: args.dashboard_id,
            dashboard_uid: args.dashboard_uid.clone(),
            panel_id: args.panel_id,
            kind: args.kind.clone(),
            from: args.from,
            to: args.to,
            limit: args.limit,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    args: &QueryArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !use_store(&config.history_settings(), &config.feature_toggles()) {
        warn!("Loki is not the configured state history backend; querying anyway");
    }

    let client = LokiClient::new(config.loki_config()?, &config.transport_config())
        .map_err(CoreError::from)?;
    debug!(url = %client.base_url(), "using loki read path");

    let catalog = Arc::new(config.catalog());
    let store = HistorianStore::new(
        Arc::new(client),
        catalog.clone(),
        catalog,
        config.store_options(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let query = ItemQuery::from(args);
    let resources = config.access_resources(query.org_id);
    let items = store.get(&cancel, &query, &resources).await?;

    let out = output::render_list(&global.output, &items, |item| AnnotationRow::from(item))?;
    output::print_output(&out)
}
