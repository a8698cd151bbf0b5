// statehist-core: Annotation reads over Loki-backed alert state history.

pub mod access;
pub mod codec;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod lookup;
pub mod model;
pub mod query;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use access::has_access;
pub use codec::{DecodeError, decode_transition, numeric_map};
pub use config::{FeatureToggles, HistorySettings, StoreOptions};
pub use eligibility::{BackendType, UnknownBackend, invalid_backends, parse_backend, use_store};
pub use error::CoreError;
pub use lookup::{DashboardLookup, DashboardRef, LookupError, RangeQuery, RuleLookup, StaticCatalog};
pub use query::{HistoryQuery, TimeWindow, build_history_query};
pub use store::HistorianStore;

pub use model::{
    AccessResources, AnnotationItem, ItemQuery, RuleMeta, State, StateTransition,
};

// Cancellation handle accepted by `HistorianStore::get`.
pub use tokio_util::sync::CancellationToken;
