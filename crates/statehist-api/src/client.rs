// Loki read-path HTTP client
//
// Wraps `reqwest::Client` with Loki URL construction, tenant/auth header
// injection and response decoding. Only the read endpoints the state
// history store needs are implemented here.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::QueryResponse;

/// Page size used when the caller asks for no limit.
pub const DEFAULT_PAGE_SIZE: i64 = 1000;
/// Largest page Loki is asked for in one request.
pub const MAXIMUM_PAGE_SIZE: i64 = 5000;

const TENANT_HEADER: &str = "X-Scope-OrgID";
const QUERY_RANGE_PATH: &str = "loki/api/v1/query_range";
const LABELS_PATH: &str = "loki/api/v1/labels";
const QUERY_DIRECTION: &str = "forward";

/// Connection settings for the Loki read path.
#[derive(Debug, Clone)]
pub struct LokiConfig {
    /// Base URL of the Loki read path (e.g. `http://loki:3100`).
    pub read_url: Url,
    /// Tenant sent as `X-Scope-OrgID`, for multi-tenant Loki.
    pub tenant_id: Option<String>,
    /// Basic auth user. Only sent when a password is also configured.
    pub basic_auth_user: Option<String>,
    pub basic_auth_password: Option<SecretString>,
}

impl LokiConfig {
    pub fn new(read_url: Url) -> Self {
        Self {
            read_url,
            tenant_id: None,
            basic_auth_user: None,
            basic_auth_password: None,
        }
    }
}

/// Async client for Loki's HTTP query API.
///
/// Cheap to share behind an `Arc`: the inner `reqwest::Client` is
/// connection-pooled and safe for concurrent use.
pub struct LokiClient {
    http: reqwest::Client,
    base_url: Url,
    tenant_id: Option<String>,
    basic_auth: Option<(String, SecretString)>,
}

impl LokiClient {
    /// Create a client from Loki settings and a `TransportConfig`.
    pub fn new(config: LokiConfig, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, config))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Tenant and basic auth headers are applied per request, so any
    /// client works here (tests pass a plain `reqwest::Client::new()`).
    pub fn with_client(http: reqwest::Client, config: LokiConfig) -> Self {
        let basic_auth = match (config.basic_auth_user, config.basic_auth_password) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        };
        Self {
            http,
            base_url: normalize_base_url(config.read_url),
            tenant_id: config.tenant_id,
            basic_auth,
        }
    }

    /// The Loki read-path base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Public API ───────────────────────────────────────────────────

    /// Run a LogQL range query.
    ///
    /// `GET /loki/api/v1/query_range?query=..&start=..&end=..&limit=..&direction=forward`
    ///
    /// `start` and `end` are Unix nanoseconds. Loki treats `start` as
    /// inclusive and `end` as exclusive. `limit` below 1 falls back to
    /// [`DEFAULT_PAGE_SIZE`] and is capped at [`MAXIMUM_PAGE_SIZE`].
    /// Entries are requested oldest first, so `limit` keeps the start of
    /// the range.
    pub async fn range_query(
        &self,
        logql: &str,
        start: i64,
        end: i64,
        limit: i64,
    ) -> Result<QueryResponse, Error> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        let limit = clamp_limit(limit);

        let url = self.url(QUERY_RANGE_PATH)?;
        debug!(%url, query = logql, start, end, limit, "querying loki");

        let params = [
            ("query", logql.to_owned()),
            ("start", start.to_string()),
            ("end", end.to_string()),
            ("limit", limit.to_string()),
            ("direction", QUERY_DIRECTION.to_owned()),
        ];
        let builder = self.apply_auth(self.http.get(url).query(&params));
        let resp = builder.send().await?;

        Self::handle_response(resp).await
    }

    /// Check that Loki is reachable and accepts our credentials.
    ///
    /// `GET /loki/api/v1/labels`
    pub async fn ping(&self) -> Result<(), Error> {
        let url = self.url(LABELS_PATH)?;
        debug!(%url, "pinging loki");

        let resp = self.apply_auth(self.http.get(url)).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    /// Apply tenant and basic auth headers to a request builder.
    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = match self.tenant_id.as_deref() {
            Some(tenant) if !tenant.is_empty() => builder.header(TENANT_HEADER, tenant),
            _ => builder,
        };
        match &self.basic_auth {
            Some((user, password)) => builder.basic_auth(user, Some(password.expose_secret())),
            None => builder,
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        let body = resp.text().await.unwrap_or_default();
        if !body.is_empty() {
            warn!(status = status.as_u16(), response = %preview(&body), "error response from loki");
        }
        Error::Loki {
            status: status.as_u16(),
            body,
        }
    }
}

/// Ensure the base URL ends with `/` so relative joins keep any path prefix
/// (e.g. a Loki gateway mounted at `/loki-read/`).
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn clamp_limit(limit: i64) -> i64 {
    if limit < 1 {
        DEFAULT_PAGE_SIZE
    } else {
        limit.min(MAXIMUM_PAGE_SIZE)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
