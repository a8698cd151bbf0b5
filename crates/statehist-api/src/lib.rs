// statehist-api: Async Rust read client for Loki-backed alert state history

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{DEFAULT_PAGE_SIZE, LokiClient, LokiConfig, MAXIMUM_PAGE_SIZE};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{LokiEntry, QueryData, QueryResponse, Sample, Stream};
