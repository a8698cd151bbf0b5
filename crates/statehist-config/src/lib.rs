//! Shared configuration for the statehist tools.
//!
//! TOML file + `STATEHIST_` environment layering, and translation into
//! the runtime types `statehist-core` and `statehist-api` expect. Core
//! never reads config files; everything it needs is built here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use statehist_api::{LokiConfig, TlsMode, TransportConfig};
use statehist_core::config::{DEFAULT_MAX_QUERY_SIZE, DEFAULT_QUERY_RANGE};
use statehist_core::{
    AccessResources, DashboardRef, FeatureToggles, HistorySettings, RuleMeta, StaticCatalog,
    StoreOptions,
};

/// Environment variable prefix; nested keys split on `__`
/// (e.g. `STATEHIST_STATE_HISTORY__BACKEND=loki`).
pub const ENV_PREFIX: &str = "STATEHIST_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub state_history: StateHistory,

    #[serde(default)]
    pub features: Features,

    /// Rules and dashboards served by the static lookups.
    #[serde(default)]
    pub catalog: Catalog,

    /// Permissions of the caller the CLI queries as.
    #[serde(default)]
    pub access: Access,
}

/// `[state_history]`: backend selection and Loki connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateHistory {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// "annotations", "loki", "multiple" or "noop".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Primary backend when `backend = "multiple"`.
    #[serde(default)]
    pub primary: String,

    /// Secondary backends when `backend = "multiple"`.
    #[serde(default)]
    pub secondaries: Vec<String>,

    /// Loki base URL, used for reads unless `loki_remote_read_url` is set.
    pub loki_remote_url: Option<String>,

    pub loki_remote_read_url: Option<String>,

    pub loki_tenant_id: Option<String>,

    pub loki_basic_auth_username: Option<String>,

    /// Basic auth password (plaintext; prefer the env var).
    pub loki_basic_auth_password: Option<String>,

    #[serde(default = "default_max_query_size")]
    pub loki_max_query_size: usize,

    /// Lookback for queries without a `from` bound.
    #[serde(default = "default_query_range_secs")]
    pub default_query_range_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for StateHistory {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: default_backend(),
            primary: String::new(),
            secondaries: Vec::new(),
            loki_remote_url: None,
            loki_remote_read_url: None,
            loki_tenant_id: None,
            loki_basic_auth_username: None,
            loki_basic_auth_password: None,
            loki_max_query_size: default_max_query_size(),
            default_query_range_secs: default_query_range_secs(),
            timeout_secs: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
fn default_backend() -> String {
    "annotations".into()
}
fn default_max_query_size() -> usize {
    DEFAULT_MAX_QUERY_SIZE
}
fn default_query_range_secs() -> u64 {
    DEFAULT_QUERY_RANGE.as_secs()
}
fn default_timeout() -> u64 {
    30
}

/// `[features]`: globally enabled feature flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Features {
    #[serde(default)]
    pub enable: Vec<String>,
}

/// `[catalog]`: `[[catalog.rules]]` and `[[catalog.dashboards]]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Catalog {
    #[serde(default)]
    pub rules: Vec<RuleMeta>,
    #[serde(default)]
    pub dashboards: Vec<DashboardRef>,
}

/// `[access]`: what the querying caller may see.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Access {
    #[serde(default = "default_enabled")]
    pub org_annotations: bool,

    #[serde(default = "default_enabled")]
    pub dashboard_annotations: bool,

    /// Permitted dashboard UIDs. Ids are resolved through the catalog.
    #[serde(default)]
    pub dashboards: Vec<String>,
}

impl Default for Access {
    fn default() -> Self {
        Self {
            org_annotations: true,
            dashboard_annotations: true,
            dashboards: Vec::new(),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "statehist", "statehist").map_or_else(
        || PathBuf::from(".").join("statehist.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// An explicit `path` must exist; the default path is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::Validation {
                    field: "config".into(),
                    reason: format!("file not found: {}", path.display()),
                });
            }
            path.to_path_buf()
        }
        None => config_path(),
    };

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Translation to runtime types ────────────────────────────────────

impl Config {
    pub fn history_settings(&self) -> HistorySettings {
        HistorySettings {
            enabled: self.state_history.enabled,
            backend: self.state_history.backend.clone(),
            multi_primary: self.state_history.primary.clone(),
            multi_secondaries: self.state_history.secondaries.clone(),
        }
    }

    pub fn feature_toggles(&self) -> FeatureToggles {
        FeatureToggles::new(self.features.enable.iter().cloned())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_query_size: self.state_history.loki_max_query_size,
            default_query_range: Duration::from_secs(self.state_history.default_query_range_secs),
        }
    }

    /// Loki read-path settings. The read URL falls back to the remote URL.
    pub fn loki_config(&self) -> Result<LokiConfig, ConfigError> {
        let history = &self.state_history;
        let raw = history
            .loki_remote_read_url
            .as_deref()
            .or(history.loki_remote_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::Validation {
                field: "state_history.loki_remote_url".into(),
                reason: "a Loki URL is required".into(),
            })?;

        let read_url = Url::parse(raw.trim()).map_err(|e| ConfigError::Validation {
            field: "state_history.loki_remote_url".into(),
            reason: format!("invalid URL {raw:?}: {e}"),
        })?;

        let mut config = LokiConfig::new(read_url);
        config.tenant_id = history.loki_tenant_id.clone().filter(|t| !t.is_empty());
        config.basic_auth_user = history
            .loki_basic_auth_username
            .clone()
            .filter(|u| !u.is_empty());
        config.basic_auth_password = history
            .loki_basic_auth_password
            .clone()
            .filter(|p| !p.is_empty())
            .map(SecretString::from);
        Ok(config)
    }

    pub fn transport_config(&self) -> TransportConfig {
        let history = &self.state_history;
        let tls = if history.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = history.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        TransportConfig {
            tls,
            timeout: Duration::from_secs(history.timeout_secs),
        }
    }

    pub fn catalog(&self) -> StaticCatalog {
        StaticCatalog::new(
            self.catalog.rules.iter().cloned(),
            self.catalog.dashboards.iter().cloned(),
        )
    }

    /// Caller permissions for `org_id`. Permitted dashboards missing from
    /// the catalog map to id 0.
    pub fn access_resources(&self, org_id: i64) -> AccessResources {
        let ids: HashMap<&str, i64> = self
            .catalog
            .dashboards
            .iter()
            .filter(|d| d.org_id == org_id)
            .map(|d| (d.uid.as_str(), d.id))
            .collect();

        AccessResources {
            dashboards: self
                .access
                .dashboards
                .iter()
                .map(|uid| (uid.clone(), ids.get(uid.as_str()).copied().unwrap_or_default()))
                .collect(),
            can_access_org_annotations: self.access.org_annotations,
            can_access_dash_annotations: self.access.dashboard_annotations,
        }
    }
}
