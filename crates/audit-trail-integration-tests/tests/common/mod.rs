//! In-process fake of the audit trail service.
//!
//! Serves the ingestion and query endpoints over real HTTP on an ephemeral
//! port, with in-memory storage, API-key checking and a schema check that
//! answers in the service's error envelope.

#![allow(dead_code)]

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// API key the fake service accepts by default.
pub const TEST_API_KEY: &str = "integration-key";

/// Longest `metadata.source` the fake service accepts.
pub const MAX_SOURCE_LEN: usize = 64;

const REQUIRED_FIELDS: [(&str, &str); 7] = [
    ("actor", "id"),
    ("actor", "type"),
    ("action", "type"),
    ("resource", "id"),
    ("resource", "type"),
    ("metadata", "source"),
    ("metadata", "tenantId"),
];

#[derive(Default)]
struct ServiceState {
    api_key: Option<String>,
    delay: Duration,
    events: Mutex<Vec<Value>>,
    seen_headers: Mutex<Vec<HeaderMap>>,
}

/// A running fake service. Shuts down when dropped.
pub struct FakeService {
    /// Bound address.
    pub addr: SocketAddr,
    state: Arc<ServiceState>,
    task: JoinHandle<()>,
}

impl FakeService {
    /// Start with the default API key and no artificial latency.
    pub async fn start() -> Self {
        Self::start_with(Some(TEST_API_KEY), Duration::ZERO).await
    }

    /// Start with an optional required API key and a per-request delay.
    pub async fn start_with(api_key: Option<&str>, delay: Duration) -> Self {
        let state = Arc::new(ServiceState {
            api_key: api_key.map(str::to_string),
            delay,
            ..ServiceState::default()
        });

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake service");
        let addr = listener.local_addr().expect("listener has an address");
        let app = router(Arc::clone(&state));
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake service crashed");
        });

        Self { addr, state, task }
    }

    /// Base URL for clients.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of events stored so far.
    pub fn stored_count(&self) -> usize {
        self.state.events.lock().expect("lock poisoned").len()
    }

    /// Headers of the most recent request.
    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.state
            .seen_headers
            .lock()
            .expect("lock poisoned")
            .last()
            .cloned()
    }

    /// Number of requests received, including rejected ones.
    pub fn request_count(&self) -> usize {
        self.state.seen_headers.lock().expect("lock poisoned").len()
    }
}

impl Drop for FakeService {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// An unused local address: bound, then released.
pub fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/api/v1/events", post(create_event).get(search_events))
        .route("/api/v1/events/batch", post(create_batch))
        .route("/api/v1/events/{id}", get(get_event))
        .route("/api/v1/search", post(search_filtered))
        .with_state(state)
}

fn error_envelope(status: StatusCode, message: &str, path: &str, violations: &[String]) -> Response {
    let body = json!({
        "timestamp": Utc::now().to_rfc3339(),
        "status": status.as_u16(),
        "error": status.canonical_reason().unwrap_or("Error"),
        "message": message,
        "path": path,
        "violations": violations,
    });
    (status, Json(body)).into_response()
}

/// Record the request and enforce the API key.
async fn admit(state: &ServiceState, headers: HeaderMap, path: &str) -> Result<(), Response> {
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }

    let presented = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .seen_headers
        .lock()
        .expect("lock poisoned")
        .push(headers);

    match (&state.api_key, presented) {
        (Some(expected), Some(key)) if *expected == key => Ok(()),
        (Some(_), _) => Err(error_envelope(
            StatusCode::UNAUTHORIZED,
            "Invalid or missing API key",
            path,
            &[],
        )),
        (None, _) => Ok(()),
    }
}

fn violations_of(event: &Value) -> Vec<String> {
    let mut violations: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|(part, field)| {
            event
                .get(part)
                .and_then(|p| p.get(field))
                .and_then(Value::as_str)
                .is_none_or(|s| s.trim().is_empty())
        })
        .map(|(part, field)| format!("{part}.{field}: must not be blank"))
        .collect();

    let source_len = event
        .pointer("/metadata/source")
        .and_then(Value::as_str)
        .map_or(0, |s| s.chars().count());
    if source_len > MAX_SOURCE_LEN {
        violations.push(format!(
            "metadata.source: size must be between 1 and {MAX_SOURCE_LEN}"
        ));
    }

    violations
}

fn store(state: &ServiceState, mut event: Value) -> Value {
    let mut events = state.events.lock().expect("lock poisoned");
    let tenant = event.pointer("/metadata/tenantId").cloned();
    let previous_hash = events
        .iter()
        .rev()
        .find(|e| e.pointer("/metadata/tenantId") == tenant.as_ref())
        .and_then(|e| e.get("hash").and_then(Value::as_str))
        .unwrap_or("GENESIS")
        .to_string();

    let mut hasher = DefaultHasher::new();
    previous_hash.hash(&mut hasher);
    event.to_string().hash(&mut hasher);
    let hash = format!("{:016x}", hasher.finish());

    let id = format!("evt-{:06}", events.len().saturating_add(1));
    let timestamp = Utc::now().to_rfc3339();

    if let Some(map) = event.as_object_mut() {
        map.insert("id".into(), json!(id));
        map.insert("timestamp".into(), json!(timestamp));
        map.insert("hash".into(), json!(hash));
        map.insert("previousHash".into(), json!(previous_hash));
        map.insert("status".into(), json!("STORED"));
    }
    events.push(event);

    json!({"id": id, "timestamp": timestamp, "hash": hash, "status": "STORED"})
}

async fn create_event(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(event): Json<Value>,
) -> Response {
    let path = "/api/v1/events";
    if let Err(rejection) = admit(&state, headers, path).await {
        return rejection;
    }

    let violations = violations_of(&event);
    if !violations.is_empty() {
        return error_envelope(StatusCode::BAD_REQUEST, "Validation failed", path, &violations);
    }

    (StatusCode::CREATED, Json(store(&state, event))).into_response()
}

async fn create_batch(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let path = "/api/v1/events/batch";
    if let Err(rejection) = admit(&state, headers, path).await {
        return rejection;
    }

    let Some(items) = body.get("events").and_then(Value::as_array) else {
        return error_envelope(
            StatusCode::BAD_REQUEST,
            "Validation failed",
            path,
            &["events: must not be null".to_string()],
        );
    };

    let mut stored = Vec::new();
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let violations = violations_of(item);
        if violations.is_empty() {
            stored.push(store(&state, item.clone()));
        } else {
            errors.push(json!({
                "index": index,
                "message": "Validation failed",
                "violations": violations,
            }));
        }
    }

    // Reported newest-first to check that clients order by index.
    errors.reverse();

    let body = json!({
        "total": items.len(),
        "succeeded": stored.len(),
        "failed": errors.len(),
        "events": stored,
        "errors": errors,
    });
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn get_event(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    let path = format!("/api/v1/events/{id}");
    if let Err(rejection) = admit(&state, headers, &path).await {
        return rejection;
    }

    let found = state
        .events
        .lock()
        .expect("lock poisoned")
        .iter()
        .find(|e| e.get("id").and_then(Value::as_str) == Some(id.as_str()))
        .cloned();
    match found {
        Some(event) => (StatusCode::OK, Json(event)).into_response(),
        None => error_envelope(
            StatusCode::NOT_FOUND,
            &format!("Event not found: {id}"),
            &path,
            &[],
        ),
    }
}

/// Largest page the filtered search serves; bigger requests are clamped.
const MAX_SEARCH_SIZE: usize = 100;

const DEFAULT_SEARCH_SIZE: usize = 20;

fn matches(event: &Value, pointer: &str, wanted: Option<&str>) -> bool {
    wanted.is_none_or(|w| event.pointer(pointer).and_then(Value::as_str) == Some(w))
}

fn blank_tenant(path: &str) -> Response {
    error_envelope(
        StatusCode::BAD_REQUEST,
        "Validation failed",
        path,
        &["tenantId: must not be blank".to_string()],
    )
}

/// One page of stored events matching every `(pointer, value)` filter and
/// the free text, in the service's paged envelope.
fn paged(
    state: &ServiceState,
    filters: &[(&str, Option<&str>)],
    text: Option<&str>,
    page: usize,
    size: usize,
    project: fn(&Value) -> Value,
) -> Response {
    let text = text.map(str::to_lowercase);
    let hits: Vec<Value> = state
        .events
        .lock()
        .expect("lock poisoned")
        .iter()
        .filter(|e| filters.iter().all(|(pointer, wanted)| matches(e, pointer, *wanted)))
        .filter(|e| {
            text.as_ref()
                .is_none_or(|t| e.to_string().to_lowercase().contains(t.as_str()))
        })
        .map(project)
        .collect();

    let total = hits.len();
    let items: Vec<Value> = hits
        .into_iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .collect();

    let body = json!({
        "items": items,
        "totalCount": total,
        "page": page,
        "size": size,
        "totalPages": total.div_ceil(size),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// Shape of a hit from the filtered search: no chain or status fields.
fn search_hit(event: &Value) -> Value {
    let field = |key: &str| event.get(key).cloned().unwrap_or(Value::Null);
    json!({
        "id": field("id"),
        "timestamp": field("timestamp"),
        "actor": field("actor"),
        "action": field("action"),
        "resource": field("resource"),
        "metadata": field("metadata"),
        "hash": field("hash"),
    })
}

/// `GET /api/v1/events` binds tenant, actor id, time window and free text
/// only. Other query parameters are ignored.
async fn search_events(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let path = "/api/v1/events";
    if let Err(rejection) = admit(&state, headers, path).await {
        return rejection;
    }

    let Some(tenant) = params.get("tenantId").filter(|t| !t.is_empty()) else {
        return blank_tenant(path);
    };
    let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let size: usize = params
        .get("size")
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_SEARCH_SIZE);

    let filters = [
        ("/metadata/tenantId", Some(tenant.as_str())),
        ("/actor/id", params.get("actorId").map(String::as_str)),
    ];
    paged(
        &state,
        &filters,
        params.get("query").map(String::as_str),
        page,
        size,
        Value::clone,
    )
}

/// `POST /api/v1/search` with a JSON search request. A size of zero or less
/// falls back to the default; larger than the cap is clamped.
async fn search_filtered(
    State(state): State<Arc<ServiceState>>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    let path = "/api/v1/search";
    if let Err(rejection) = admit(&state, headers, path).await {
        return rejection;
    }

    let field = |key: &str| request.get(key).and_then(Value::as_str);
    let Some(tenant) = field("tenantId").filter(|t| !t.is_empty()) else {
        return blank_tenant(path);
    };
    let page = request
        .get("page")
        .and_then(Value::as_u64)
        .and_then(|p| usize::try_from(p).ok())
        .unwrap_or(0);
    let size = match request.get("size").and_then(Value::as_i64) {
        Some(s) if s > 0 => usize::try_from(s).map_or(MAX_SEARCH_SIZE, |s| s.min(MAX_SEARCH_SIZE)),
        _ => DEFAULT_SEARCH_SIZE,
    };

    let filters = [
        ("/metadata/tenantId", Some(tenant)),
        ("/actor/id", field("actorId")),
        ("/actor/type", field("actorType")),
        ("/action/type", field("actionType")),
        ("/resource/id", field("resourceId")),
        ("/resource/type", field("resourceType")),
    ];
    paged(&state, &filters, field("query"), page, size, search_hit)
}
