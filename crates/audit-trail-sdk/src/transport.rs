//! HTTP exchange seam.
//!
//! The client speaks to the service through [`Transport`]. The default
//! implementation is [`ReqwestTransport`]; tests substitute a scripted one.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AuditTrailError, AuditTrailResult};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// HTTP method used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Unencoded path segments appended to the base URL.
    pub segments: Vec<String>,
    /// Query-string pairs.
    pub query: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl TransportRequest {
    /// `GET` request for the given path segments.
    #[must_use]
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::Get,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// `POST` request with a JSON body.
    #[must_use]
    pub fn post<I, S>(segments: I, body: Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::Post,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Append query pairs.
    #[must_use]
    pub fn with_query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Unencoded path, e.g. `/api/v1/events`.
    #[must_use]
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Value of a query parameter, if present.
    #[must_use]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, possibly empty.
    pub body: String,
}

impl TransportResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns the raw response.
///
/// Implementations return [`AuditTrailError::Connection`] when no response
/// was obtained. Any HTTP status, including errors, is a successful exchange
/// at this layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the exchange.
    async fn send(&self, request: TransportRequest) -> AuditTrailResult<TransportResponse>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    /// Build a transport sending the configured headers with every request.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if a header is malformed, or
    /// [`AuditTrailError::Connection`] if the HTTP client cannot start.
    pub fn new(config: &ClientConfig) -> AuditTrailResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers(config)?)
            .build()
            .map_err(|e| AuditTrailError::connection("failed to initialise HTTP client").with_cause(e))?;

        Ok(Self {
            client,
            base_url: config.base_url().clone(),
        })
    }

    fn url_for(&self, request: &TransportRequest) -> AuditTrailResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| AuditTrailError::validation("server_url cannot be used as a base URL"))?
            .pop_if_empty()
            .extend(&request.segments);
        Ok(url)
    }
}

fn default_headers(config: &ClientConfig) -> AuditTrailResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, header_value("user_agent", config.user_agent())?);

    if let Some(key) = config.api_key() {
        let mut value = header_value("api_key", key)?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
    }

    for (name, value) in config.headers() {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            AuditTrailError::validation(format!("invalid header name {name:?}"))
                .with_violations([e.to_string()])
        })?;
        headers.insert(header_name, header_value(name, value)?);
    }

    Ok(headers)
}

fn header_value(field: &str, value: &str) -> AuditTrailResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        AuditTrailError::validation(format!("{field} contains characters not allowed in a header"))
            .with_violations([e.to_string()])
    })
}

fn transport_error(url: &Url, err: reqwest::Error) -> AuditTrailError {
    if err.is_timeout() {
        AuditTrailError::connection(format!("request to {url} timed out"))
            .with_timeout()
            .with_cause(err)
    } else {
        AuditTrailError::connection(format!("request to {url} failed: {err}")).with_cause(err)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> AuditTrailResult<TransportResponse> {
        let url = self.url_for(&request)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                AuditTrailError::validation("request body could not be serialized")
                    .with_violations([e.to_string()])
            })?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(|e| transport_error(&url, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(&url, e))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientBuilder;

    fn transport(server_url: &str) -> ReqwestTransport {
        let config = ClientBuilder::new().server_url(server_url).build_config().unwrap();
        ReqwestTransport::new(&config).unwrap()
    }

    #[test]
    fn test_request_path_and_query() {
        let request = TransportRequest::get(["api", "v1", "events"]).with_query([("page", "0")]);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path(), "/api/v1/events");
        assert_eq!(request.query_param("page"), Some("0"));
        assert_eq!(request.query_param("size"), None);
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let t = transport("http://localhost:8080/");
        let url = t
            .url_for(&TransportRequest::get(["api", "v1", "events"]))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/events");
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let t = transport("http://localhost:8080/audit");
        let url = t.url_for(&TransportRequest::get(["api", "v1"])).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/audit/api/v1");
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let t = transport("http://localhost");
        let url = t
            .url_for(&TransportRequest::get(["api", "v1", "events", "a b/c"]))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost/api/v1/events/a%20b%2Fc");
    }

    #[test]
    fn test_custom_headers_win() {
        let config = ClientBuilder::new()
            .server_url("http://localhost")
            .api_key("secret")
            .header("Accept", "application/x-ndjson")
            .header("X-Trace", "1")
            .build_config()
            .unwrap();
        let headers = default_headers(&config).unwrap();
        assert_eq!(headers[ACCEPT], "application/x-ndjson");
        assert_eq!(headers["x-trace"], "1");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert!(headers[API_KEY_HEADER].is_sensitive());
        assert!(
            headers[USER_AGENT]
                .to_str()
                .unwrap()
                .starts_with("audit-trail-sdk-rust/")
        );
    }

    #[test]
    fn test_no_api_key_header_without_key() {
        let config = ClientBuilder::new()
            .server_url("http://localhost")
            .build_config()
            .unwrap();
        assert!(!default_headers(&config).unwrap().contains_key(API_KEY_HEADER));
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(201, "").is_success());
        assert!(!TransportResponse::new(404, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
    }

    #[tokio::test]
    async fn test_refused_connection_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let t = transport(&format!("http://127.0.0.1:{port}"));
        let err = t
            .send(TransportRequest::get(["api", "v1", "events"]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert!(!err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());
    }
}
