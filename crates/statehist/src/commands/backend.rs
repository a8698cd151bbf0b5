//! `statehist backend`: eligibility report for the configured backend.

use std::fmt::Write as _;

use serde::Serialize;

use statehist_api::LokiClient;
use statehist_config::Config;
use statehist_core::config::{FLAG_LOKI_ONLY, FLAG_LOKI_PRIMARY, FLAG_LOKI_SECONDARY};
use statehist_core::{CoreError, invalid_backends, use_store};

use crate::cli::{BackendArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct BackendReport {
    enabled: bool,
    backend: String,
    primary: String,
    secondaries: Vec<String>,
    invalid: Vec<String>,
    flags: Vec<FlagState>,
    use_loki: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    loki_reachable: Option<bool>,
}

#[derive(Debug, Serialize)]
struct FlagState {
    name: &'static str,
    enabled: bool,
}

fn detail(report: &BackendReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Enabled:      {}", report.enabled);
    let _ = writeln!(out, "Backend:      {}", report.backend);
    if !report.primary.is_empty() || !report.secondaries.is_empty() {
        let _ = writeln!(out, "Primary:      {}", report.primary);
        let _ = writeln!(out, "Secondaries:  {}", report.secondaries.join(", "));
    }
    for name in &report.invalid {
        let _ = writeln!(out, "Invalid:      {name:?}");
    }
    for flag in &report.flags {
        let _ = writeln!(out, "{:<32}  {}", flag.name, if flag.enabled { "on" } else { "off" });
    }
    if let Some(reachable) = report.loki_reachable {
        let _ = writeln!(out, "Loki reachable: {reachable}");
    }
    let _ = write!(
        out,
        "Loki store:   {}",
        if report.use_loki { "in use" } else { "not in use" }
    );
    out
}

pub async fn handle(
    args: &BackendArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let settings = config.history_settings();
    let features = config.feature_toggles();

    let loki_reachable = if args.ping {
        let client = LokiClient::new(config.loki_config()?, &config.transport_config())
            .map_err(CoreError::from)?;
        client.ping().await.map_err(CoreError::from)?;
        Some(true)
    } else {
        None
    };

    let report = BackendReport {
        enabled: settings.enabled,
        backend: settings.backend.clone(),
        primary: settings.multi_primary.clone(),
        secondaries: settings.multi_secondaries.clone(),
        invalid: invalid_backends(&settings)
            .into_iter()
            .map(|e| e.name)
            .collect(),
        flags: [FLAG_LOKI_ONLY, FLAG_LOKI_PRIMARY, FLAG_LOKI_SECONDARY]
            .into_iter()
            .map(|name| FlagState {
                name,
                enabled: features.is_enabled(name),
            })
            .collect(),
        use_loki: use_store(&settings, &features),
        loki_reachable,
    };

    let out = output::render_single(&global.output, &report, detail)?;
    output::print_output(&out)
}
