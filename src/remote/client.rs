//! HTTP remote source.
//!
//! Fetches option pages from a JSON endpoint with `reqwest`. Failures are
//! reported once; retrying is left to the user (reload or a new search).

use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::error::{RemoteError, Result};
use super::source::RemoteSource;
use super::types::{RemotePage, RemoteRequest, SelectedRequest};
use crate::auth::{self, InternalRequest, InternalSigner};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Option source backed by an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpRemoteSource {
    /// The HTTP client.
    client: Client,
    /// Base URL that root-relative endpoints are resolved against.
    base_url: Option<String>,
    /// Signs requests with the internal auth header when set.
    signer: Option<InternalSigner>,
}

impl HttpRemoteSource {
    /// Create a source with the default timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a source with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Self::build_http_client(timeout)?,
            base_url: None,
            signer: None,
        })
    }

    /// Resolve root-relative endpoints like `/api/users` against `base_url`.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(normalize_base_url(base_url));
        self
    }

    /// Sign every request with the internal auth header.
    pub fn with_signer(mut self, signer: InternalSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    fn build_http_client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteError::Network)
    }

    /// Build the full request URL for an endpoint and query parameters.
    pub fn resolve_url(&self, endpoint: &str, pairs: &[(String, String)]) -> Result<Url> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(RemoteError::NoEndpoint);
        }

        let base = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            let base_url = self.base_url.as_deref().ok_or_else(|| {
                RemoteError::InvalidUrl(format!(
                    "relative endpoint {} needs a base URL",
                    endpoint
                ))
            })?;
            format!("{}{}", base_url, endpoint)
        } else {
            return Err(RemoteError::InvalidUrl(endpoint.to_string()));
        };

        let query = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let full = if query.is_empty() {
            base
        } else if base.contains('?') {
            format!("{}&{}", base, query)
        } else {
            format!("{}?{}", base, query)
        };

        Url::parse(&full).map_err(|e| RemoteError::InvalidUrl(format!("{}: {}", full, e)))
    }

    /// Produce the internal auth header value for a GET of `url`, if signing.
    fn auth_header(&self, url: &Url) -> Result<Option<String>> {
        let Some(signer) = &self.signer else {
            return Ok(None);
        };
        let host = url.origin().ascii_serialization();
        let request = InternalRequest {
            method: "GET",
            path: url.path(),
            host: &host,
            body: b"",
        };
        signer
            .sign(&request, auth::unix_now())
            .map(Some)
            .map_err(|e| RemoteError::Signing(e.to_string()))
    }

    /// Execute a single GET request and parse the JSON body.
    async fn get_json(&self, url: Url) -> Result<Value> {
        let mut request = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .header("X-Requested-With", "XMLHttpRequest");

        if let Some(token) = self.auth_header(&url)? {
            request = request.header(auth::HEADER_NAME, token);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Handle an HTTP response, converting errors appropriately.
    async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();
        let url = response.url().to_string();

        if status.is_success() {
            response
                .json::<Value>()
                .await
                .map_err(|e| RemoteError::InvalidResponse(format!("Failed to parse response: {}", e)))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            debug!("Error response body: {}", error_body);

            Err(Self::error_from_response(status, &url, &error_body))
        }
    }

    /// Create an appropriate error from an HTTP response.
    fn error_from_response(status: StatusCode, url: &str, body: &str) -> RemoteError {
        let context = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| {
                json.get("message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| url.to_string());

        RemoteError::from_status(status, &context)
    }
}

impl RemoteSource for HttpRemoteSource {
    #[instrument(skip(self, request), fields(token = %request.token, page = request.page))]
    async fn fetch_page(&self, request: &RemoteRequest) -> Result<RemotePage> {
        let url = self.resolve_url(&request.endpoint, &request.query_pairs())?;
        debug!("Fetching options from {}", url);

        let payload = self.get_json(url).await.map_err(|e| {
            warn!("Option request failed: {}", e);
            e
        })?;
        let page = RemotePage::from_payload(payload, request.per_page)?;

        debug!("Fetched {} records (has_more: {})", page.len(), page.has_more);
        Ok(page)
    }

    #[instrument(skip(self, request), fields(values = request.values.len()))]
    async fn fetch_selected(&self, request: &SelectedRequest) -> Result<RemotePage> {
        let url = self.resolve_url(&request.endpoint, &request.query_pairs())?;
        debug!("Fetching selected options from {}", url);

        let payload = self.get_json(url).await?;
        let page = RemotePage::from_payload(payload, 0)?;
        Ok(RemotePage {
            has_more: false,
            ..page
        })
    }
}

/// Normalize a base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');

    if !url.starts_with("https://") && !url.contains("localhost") && !url.contains("127.0.0.1") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}
