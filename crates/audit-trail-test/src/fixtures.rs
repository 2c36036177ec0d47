//! Canned events and service responses.

use serde_json::{Value, json};

use audit_trail_sdk::{Action, Actor, Event, EventMetadata, Resource};

/// Tenant used by every fixture.
pub const TEST_TENANT: &str = "tenant-001";

/// A valid document-creation event.
#[must_use]
pub fn sample_event() -> Event {
    sample_event_for("user-123", "doc-456")
}

/// A valid event for the given actor and document.
///
/// # Panics
///
/// Panics if either id is blank.
#[must_use]
pub fn sample_event_for(actor_id: &str, document_id: &str) -> Event {
    Event::create(
        Actor::user(actor_id)
            .expect("valid actor")
            .with_name("John Doe")
            .with_ip("192.168.1.1"),
        Action::create().with_description("Created document"),
        Resource::document(document_id)
            .expect("valid resource")
            .with_name("Q4 Report.pdf"),
        EventMetadata::create("web-app", TEST_TENANT)
            .expect("valid metadata")
            .with_correlation_id("req-789"),
    )
    .expect("valid event")
}

/// `count` distinct valid events.
#[must_use]
pub fn sample_events(count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| sample_event_for(&format!("user-{i}"), &format!("doc-{i}")))
        .collect()
}

/// Body the service returns for an accepted event.
#[must_use]
pub fn event_response_json(id: &str) -> Value {
    json!({
        "id": id,
        "timestamp": "2024-01-15T10:30:00Z",
        "hash": format!("hash-{id}"),
        "status": "STORED"
    })
}

/// Body the service returns for an event lookup.
#[must_use]
pub fn stored_event_json(id: &str, event: &Event) -> Value {
    let mut body = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    if let Some(map) = body.as_object_mut() {
        map.insert("id".into(), json!(id));
        map.insert("timestamp".into(), json!("2024-01-15T10:30:00Z"));
        map.insert("hash".into(), json!(format!("hash-{id}")));
        map.insert("status".into(), json!("STORED"));
    }
    body
}

/// Error envelope the service returns for a schema violation.
#[must_use]
pub fn validation_error_json(violations: &[&str]) -> Value {
    json!({
        "timestamp": "2024-01-15T10:30:00Z",
        "status": 400,
        "error": "Bad Request",
        "message": "Validation failed",
        "path": "/api/v1/events",
        "violations": violations
    })
}
