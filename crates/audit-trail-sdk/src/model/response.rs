//! Values returned by the audit service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::{Action, Actor, Event, EventMetadata, Resource};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Acknowledgement of a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    /// Server-assigned identifier.
    pub id: String,
    /// Server-side storage time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Integrity hash chaining this event to its predecessor.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hash: String,
    /// Storage status, e.g. `"STORED"`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
}

/// Per-item failure inside a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    /// Position of the rejected event in the submitted batch.
    pub index: usize,
    /// Why the item was rejected. Empty when the service gave no reason.
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Field-level violations, if the rejection was a schema failure.
    #[serde(default, deserialize_with = "null_as_default")]
    pub violations: Vec<String>,
}

/// Outcome of a batch submission.
///
/// `succeeded + failed == total`, and `events` lists the accepted items in
/// submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Number of submitted events.
    pub total: usize,
    /// Number of events stored.
    pub succeeded: usize,
    /// Number of events rejected.
    pub failed: usize,
    /// Acknowledgements for the stored events.
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: Vec<EventResponse>,
    /// Rejections, ordered by batch index.
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<BatchItemError>,
}

impl BatchResponse {
    /// Response for an empty batch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether every submitted event was stored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }

    /// Batch indices of rejected events, ascending.
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.errors.iter().map(|e| e.index).collect()
    }

    pub(crate) fn sort_errors(&mut self) {
        self.errors.sort_by_key(|e| e.index);
    }
}

/// An event as stored by the service, returned by lookups and searches.
///
/// Every part is optional because search projections may omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    /// Server-assigned identifier.
    pub id: String,
    /// Server-side storage time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Integrity hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Hash of the preceding event in the tenant's chain.
    #[serde(default, alias = "previous_hash", skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    /// Storage status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Who performed the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Actor>,
    /// What was done.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// What it was done to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    /// Provenance and tenancy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
}

impl StoredEvent {
    /// Rebuild the submitted event, if all four parts were returned.
    #[must_use]
    pub fn event(&self) -> Option<Event> {
        Event::create(
            self.actor.clone()?,
            self.action.clone()?,
            self.resource.clone()?,
            self.metadata.clone()?,
        )
        .ok()
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    /// Total number of matches across all pages.
    #[serde(default, alias = "total", alias = "total_count")]
    pub total_count: u64,
    /// Zero-based page index.
    #[serde(default)]
    pub page: u32,
    /// Requested page size.
    #[serde(default)]
    pub size: u32,
    /// Number of pages.
    #[serde(default, alias = "total_pages")]
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    /// Whether this page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a further page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_response_from_service() {
        let response: EventResponse = serde_json::from_value(json!({
            "id": "evt-123",
            "timestamp": "2024-01-15T10:30:00Z",
            "hash": "abc123",
            "status": "STORED"
        }))
        .unwrap();
        assert_eq!(response.id, "evt-123");
        assert_eq!(response.hash, "abc123");
        assert_eq!(response.status, "STORED");
        assert!(response.timestamp.is_some());
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let response: BatchResponse = serde_json::from_value(json!({
            "total": 1,
            "succeeded": 0,
            "failed": 1,
            "events": null,
            "errors": [{"index": 0, "message": null, "violations": null}]
        }))
        .unwrap();
        assert!(response.events.is_empty());
        assert_eq!(response.errors[0].message, "");
        assert!(response.errors[0].violations.is_empty());

        let ack: EventResponse =
            serde_json::from_value(json!({"id": "a", "hash": null, "status": null})).unwrap();
        assert!(ack.hash.is_empty());
        assert!(ack.status.is_empty());
    }

    #[test]
    fn test_batch_helpers() {
        let response: BatchResponse = serde_json::from_value(json!({
            "total": 3,
            "succeeded": 2,
            "failed": 1,
            "events": [
                {"id": "a", "hash": "h1", "status": "STORED"},
                {"id": "b", "hash": "h2", "status": "STORED"}
            ],
            "errors": [{"index": 1, "message": "invalid", "violations": ["actor.id is required"]}]
        }))
        .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.failed_indices(), [1]);
        assert_eq!(response.succeeded + response.failed, response.total);
    }

    #[test]
    fn test_empty_batch() {
        let response = BatchResponse::empty();
        assert_eq!((response.total, response.succeeded, response.failed), (0, 0, 0));
        assert!(response.is_success());
    }

    #[test]
    fn test_errors_sorted_by_index() {
        let mut response = BatchResponse {
            total: 3,
            failed: 2,
            errors: vec![
                BatchItemError {
                    index: 2,
                    message: "late".into(),
                    violations: vec![],
                },
                BatchItemError {
                    index: 0,
                    message: "early".into(),
                    violations: vec![],
                },
            ],
            ..BatchResponse::default()
        };
        response.sort_errors();
        assert_eq!(response.failed_indices(), [0, 2]);
    }

    #[test]
    fn test_paged_result_aliases() {
        let camel: PagedResult<StoredEvent> = serde_json::from_value(json!({
            "items": [{"id": "e1"}],
            "totalCount": 45,
            "page": 0,
            "size": 20,
            "totalPages": 3
        }))
        .unwrap();
        let legacy: PagedResult<StoredEvent> = serde_json::from_value(json!({
            "items": [{"id": "e1"}],
            "total": 45,
            "page": 0,
            "size": 20,
            "total_pages": 3
        }))
        .unwrap();
        assert_eq!(camel, legacy);
        assert!(camel.has_next());
        assert!(!camel.is_empty());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page: PagedResult<StoredEvent> =
            serde_json::from_value(json!({"items": [], "totalCount": 0, "page": 0, "size": 20, "totalPages": 0}))
                .unwrap();
        assert!(page.is_empty());
        assert!(!page.has_next());
    }

    #[test]
    fn test_stored_event_rebuilds_event() {
        let stored: StoredEvent = serde_json::from_value(json!({
            "id": "evt-1",
            "previousHash": "p",
            "actor": {"id": "u", "type": "USER"},
            "action": {"type": "READ"},
            "resource": {"id": "d", "type": "DOCUMENT"},
            "metadata": {"source": "app", "tenantId": "t"}
        }))
        .unwrap();
        assert_eq!(stored.previous_hash.as_deref(), Some("p"));
        let event = stored.event().unwrap();
        assert_eq!(event.action().action_type(), "READ");

        let partial = StoredEvent {
            actor: None,
            ..stored
        };
        assert!(partial.event().is_none());
    }
}
