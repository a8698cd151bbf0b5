// ── Backend eligibility ──
//
// Decides whether annotation reads should be served from Loki state
// history for a given deployment configuration.

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;
use tracing::debug;

use crate::config::{FLAG_LOKI_ONLY, FLAG_LOKI_PRIMARY, FeatureToggles, HistorySettings};

/// Known state history backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendType {
    Annotations,
    Loki,
    Multiple,
    Noop,
}

/// A configured backend name that is not a [`BackendType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized state history backend: {name:?}")]
pub struct UnknownBackend {
    pub name: String,
}

/// Parse a configured backend name, ignoring case and surrounding space.
pub fn parse_backend(name: &str) -> Result<BackendType, UnknownBackend> {
    name.trim().parse().map_err(|_| UnknownBackend {
        name: name.to_owned(),
    })
}

/// Parse a backend that sits under `multiple`; `multiple` itself is not
/// allowed there.
fn parse_member_backend(name: &str) -> Result<BackendType, UnknownBackend> {
    match parse_backend(name)? {
        BackendType::Multiple => Err(UnknownBackend {
            name: name.to_owned(),
        }),
        other => Ok(other),
    }
}

/// Every configured backend name that fails to parse.
///
/// Primary and secondaries are only checked when `backend` is `multiple`.
pub fn invalid_backends(settings: &HistorySettings) -> Vec<UnknownBackend> {
    let backend = match parse_backend(&settings.backend) {
        Ok(backend) => backend,
        Err(e) => return vec![e],
    };
    if backend != BackendType::Multiple {
        return Vec::new();
    }

    std::iter::once(settings.multi_primary.as_str())
        .chain(settings.multi_secondaries.iter().map(String::as_str))
        .filter_map(|name| parse_member_backend(name).err())
        .collect()
}

/// Whether the Loki-backed annotation store should serve reads.
///
/// True only for an enabled, Loki-only deployment with the Loki primary
/// and Loki-only feature flags on. Any unrecognized backend name, or Loki
/// running as one of several backends, disables it.
pub fn use_store(settings: &HistorySettings, features: &FeatureToggles) -> bool {
    if !settings.enabled {
        return false;
    }

    let invalid = invalid_backends(settings);
    if let Some(first) = invalid.first() {
        debug!(error = %first, count = invalid.len(), "state history backend misconfigured");
        return false;
    }

    match parse_backend(&settings.backend) {
        Ok(BackendType::Loki) => {
            features.is_enabled(FLAG_LOKI_PRIMARY) && features.is_enabled(FLAG_LOKI_ONLY)
        }
        _ => false,
    }
}
