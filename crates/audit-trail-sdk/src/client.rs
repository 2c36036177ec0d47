//! Async client for the audit trail service.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::config::{ClientBuilder, ClientConfig};
use crate::error::{AuditTrailError, AuditTrailResult};
use crate::model::{BatchResponse, Event, EventResponse, PagedResult, SearchCriteria, StoredEvent};
use crate::retry::{RetryOutcome, retry};
use crate::transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

const EVENTS_PATH: [&str; 3] = ["api", "v1", "events"];
const SEARCH_PATH: [&str; 3] = ["api", "v1", "search"];
const BATCH_SEGMENT: &str = "batch";

/// Longest raw body excerpt quoted in an error message.
const BODY_EXCERPT_CHARS: usize = 200;

/// Async handle to the audit trail service.
///
/// Cheap to clone; clones share one connection pool and one configuration.
#[derive(Clone)]
pub struct AuditTrailClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for AuditTrailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditTrailClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AuditTrailClient {
    /// Start configuring a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Client for `server_url` with default settings.
    ///
    /// # Errors
    ///
    /// Same as [`ClientBuilder::build`].
    pub fn new(server_url: impl Into<String>, api_key: Option<&str>) -> AuditTrailResult<Self> {
        let mut builder = ClientBuilder::new();
        builder.server_url(server_url);
        if let Some(key) = api_key {
            builder.api_key(key);
        }
        builder.build()
    }

    /// Client using the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Connection`] if the HTTP client cannot start.
    pub fn from_config(config: ClientConfig) -> AuditTrailResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Client using a caller-supplied transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, transport }),
        }
    }

    /// Frozen configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Submit one event.
    ///
    /// # Errors
    ///
    /// - [`AuditTrailError::Validation`] if the event is invalid locally or
    ///   rejected by the service's schema checks. Nothing is sent in the
    ///   local case.
    /// - [`AuditTrailError::Api`] for any other non-2xx response.
    /// - [`AuditTrailError::Connection`] once retries are exhausted.
    pub async fn log(&self, event: &Event) -> AuditTrailResult<EventResponse> {
        if let Err(err) = event.validate() {
            debug!(violations = ?err.violations(), "Rejected invalid event");
            return Err(err);
        }

        let request = TransportRequest::post(EVENTS_PATH, to_body(event)?);
        let response = self.execute(request).await?;
        decode(&response, "event")
    }

    /// Submit several events in one request.
    ///
    /// An empty slice returns an all-zero response without contacting the
    /// service. Partial failures are reported in
    /// [`BatchResponse::errors`], not as an error.
    ///
    /// # Errors
    ///
    /// As for [`Self::log`]. Local violations are prefixed with
    /// `events[i].` and fail the whole batch.
    pub async fn log_batch(&self, events: &[Event]) -> AuditTrailResult<BatchResponse> {
        if events.is_empty() {
            return Ok(BatchResponse::empty());
        }

        let violations: Vec<String> = events
            .iter()
            .enumerate()
            .flat_map(|(i, event)| {
                event
                    .violations()
                    .into_iter()
                    .map(move |v| format!("events[{i}].{v}"))
            })
            .collect();
        if !violations.is_empty() {
            debug!(violations = ?violations, "Rejected invalid batch");
            return Err(AuditTrailError::validation("invalid events in batch").with_violations(violations));
        }

        let items = to_body(events)?;
        let body = serde_json::json!({ "events": items });
        let path = EVENTS_PATH.into_iter().chain([BATCH_SEGMENT]);
        let response = self.execute(TransportRequest::post(path, body)).await?;
        let mut batch: BatchResponse = decode(&response, "batch")?;
        batch.sort_errors();
        Ok(batch)
    }

    /// Fetch one stored event. A 404 yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// [`AuditTrailError::Validation`] for a blank id, otherwise as for
    /// [`Self::log`]. The service expects ids in UUID form and answers a
    /// malformed one with a 500, which surfaces as [`AuditTrailError::Api`]
    /// rather than `Ok(None)`.
    pub async fn get_by_id(&self, id: &str) -> AuditTrailResult<Option<StoredEvent>> {
        if id.trim().is_empty() {
            return Err(AuditTrailError::validation("event id is required")
                .with_violations(["id is required"]));
        }

        let path = EVENTS_PATH.into_iter().chain([id]);
        match self.execute(TransportRequest::get(path)).await {
            Ok(response) => decode(&response, "event").map(Some),
            Err(err) if err.status_code() == Some(404) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Search a tenant's events.
    ///
    /// Criteria filtering by actor type, action type or resource are posted
    /// to the search endpoint; the rest use the event listing.
    ///
    /// # Errors
    ///
    /// [`AuditTrailError::Validation`] if the criteria are invalid, otherwise
    /// as for [`Self::log`].
    pub async fn search(&self, criteria: &SearchCriteria) -> AuditTrailResult<PagedResult<StoredEvent>> {
        criteria.validate()?;
        let request = if criteria.uses_search_endpoint() {
            TransportRequest::post(SEARCH_PATH, criteria.to_search_body())
        } else {
            TransportRequest::get(EVENTS_PATH).with_query(criteria.to_query())
        };
        let response = self.execute(request).await?;
        decode(&response, "search result")
    }

    /// Free-text search within a tenant.
    ///
    /// # Errors
    ///
    /// As for [`Self::search`].
    pub async fn quick_search(
        &self,
        text: &str,
        tenant_id: &str,
        page: u32,
        size: u32,
    ) -> AuditTrailResult<PagedResult<StoredEvent>> {
        let criteria = SearchCriteria::for_tenant(tenant_id)
            .query(text)
            .page(page)
            .size(size);
        self.search(&criteria).await
    }

    /// Send with retries, then map the status.
    async fn execute(&self, request: TransportRequest) -> AuditTrailResult<TransportResponse> {
        let policy = self.inner.config.retry_policy();
        let transport = &self.inner.transport;
        let path = request.path();

        let outcome = retry(
            policy,
            |attempt| {
                let request = request.clone();
                let path = path.as_str();
                async move {
                    debug!(method = %request.method, path, attempt, "Sending audit request");
                    transport.send(request).await
                }
            },
            AuditTrailError::is_retryable,
        )
        .await;

        let response = match outcome {
            RetryOutcome::Success(response) => response,
            RetryOutcome::Exhausted { error, attempts } => {
                if error.is_retryable() {
                    error!(path = %path, attempts, error = %error, "Audit service unreachable");
                }
                return Err(error);
            },
        };

        check_status(response, &path)
    }
}

fn to_body<T: Serialize + ?Sized>(value: &T) -> AuditTrailResult<Value> {
    serde_json::to_value(value).map_err(|e| {
        AuditTrailError::validation("payload could not be serialized").with_violations([e.to_string()])
    })
}

fn decode<T: DeserializeOwned>(response: &TransportResponse, what: &str) -> AuditTrailResult<T> {
    serde_json::from_str(&response.body).map_err(|e| {
        AuditTrailError::api(
            format!("unexpected {what} response from audit service: {e}"),
            response.status,
        )
    })
}

/// Map a non-2xx response to the matching error kind.
fn check_status(response: TransportResponse, path: &str) -> AuditTrailResult<TransportResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let status = response.status;
    if status == 404 {
        debug!(path, "Audit service returned 404");
    } else {
        error!(status, path, body = %response.body, "Audit service error");
    }

    let body: Option<Value> = serde_json::from_str(&response.body).ok();
    let server_message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    if matches!(status, 400 | 422) {
        let violations: Vec<String> = body
            .as_ref()
            .and_then(|b| b.get("violations"))
            .and_then(Value::as_array)
            .map(|items| items.iter().map(violation_text).collect())
            .unwrap_or_default();
        if !violations.is_empty() {
            let message = server_message.unwrap_or_else(|| "request rejected by audit service".into());
            return Err(AuditTrailError::validation(message).with_violations(violations));
        }
    }

    let detail = server_message.unwrap_or_else(|| excerpt(&response.body));
    let err = AuditTrailError::api(format!("HTTP {status}: {detail}"), status);
    Err(match body {
        Some(body) => err.with_body(body),
        None => err,
    })
}

fn violation_text(item: &Value) -> String {
    match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => match (
            map.get("field").and_then(Value::as_str),
            map.get("message").and_then(Value::as_str),
        ) {
            (Some(field), Some(message)) => format!("{field}: {message}"),
            (None, Some(message)) => message.to_string(),
            _ => item.to_string(),
        },
        other => other.to_string(),
    }
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no response body".to_string();
    }
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_passes_through() {
        let response = TransportResponse::new(201, "{}");
        assert!(check_status(response, "/api/v1/events").is_ok());
    }

    #[test]
    fn test_server_violations_become_validation() {
        let body = json!({
            "status": 400,
            "error": "Bad Request",
            "message": "Validation failed",
            "violations": ["actor.id: must not be blank", {"field": "metadata.tenantId", "message": "must not be blank"}]
        });
        let err = check_status(TransportResponse::new(400, body.to_string()), "/p").unwrap_err();
        assert_eq!(err.to_string(), "Validation failed");
        assert_eq!(
            err.violations(),
            ["actor.id: must not be blank", "metadata.tenantId: must not be blank"]
        );
    }

    #[test]
    fn test_bad_request_without_violations_is_api() {
        let body = json!({"message": "Malformed JSON"});
        let err = check_status(TransportResponse::new(400, body.to_string()), "/p").unwrap_err();
        assert_eq!(err.status_code(), Some(400));
        assert_eq!(err.to_string(), "HTTP 400: Malformed JSON");
        assert_eq!(err.body(), Some(&body));
    }

    #[test]
    fn test_non_json_error_body() {
        let err = check_status(TransportResponse::new(502, "<html>bad gateway</html>"), "/p").unwrap_err();
        assert!(err.is_server_error());
        assert!(err.body().is_none());
        assert_eq!(err.to_string(), "HTTP 502: <html>bad gateway</html>");
    }

    #[test]
    fn test_empty_error_body() {
        let err = check_status(TransportResponse::new(500, ""), "/p").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: no response body");
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_EXCERPT_CHARS.saturating_add(10));
        let cut = excerpt(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), BODY_EXCERPT_CHARS.saturating_add(3));
    }

    #[test]
    fn test_undecodable_success_body_is_api_error() {
        let err = decode::<EventResponse>(&TransportResponse::new(201, "not json"), "event").unwrap_err();
        assert_eq!(err.status_code(), Some(201));
        assert!(err.body().is_none());
    }
}
