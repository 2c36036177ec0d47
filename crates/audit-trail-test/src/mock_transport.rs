//! Scripted transport for testing.
//!
//! [`MockTransport`] replays queued [`MockReply`]s in order and records every
//! request it receives, so tests can assert on method, path, query and body
//! without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use audit_trail_sdk::{
    AuditTrailClient, AuditTrailError, AuditTrailResult, ClientBuilder, Transport,
    TransportRequest, TransportResponse,
};

/// One scripted outcome.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// The service answers with this status and body.
    Response {
        /// HTTP status.
        status: u16,
        /// Raw body.
        body: String,
    },
    /// No response: the connection failed.
    ConnectionError(
        /// Error message.
        String,
    ),
    /// No response: the request timed out.
    Timeout,
}

impl MockReply {
    /// Reply with a JSON body.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self::Response {
            status,
            body: body.to_string(),
        }
    }

    /// Reply with a raw text body.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::Response {
            status,
            body: body.into(),
        }
    }

    /// Reply with a status and an empty body.
    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::text(status, "")
    }

    /// Fail the exchange as if the server were unreachable.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError(message.into())
    }

    /// Fail the exchange as a timeout.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }
}

/// A deterministic, queue-based [`Transport`] for tests.
///
/// When the queue runs dry every further call fails with a connection error.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// Create a transport preloaded with `replies`.
    #[must_use]
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from(replies)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn push(&self, reply: MockReply) {
        self.replies.lock().expect("lock poisoned").push_back(reply);
    }

    /// Number of requests received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }

    /// Snapshot of every request received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// The most recent request.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().expect("lock poisoned").last().cloned()
    }

    /// Number of replies still queued.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> AuditTrailResult<TransportResponse> {
        self.requests
            .lock()
            .expect("lock poisoned")
            .push(request);

        let reply = self.replies.lock().expect("lock poisoned").pop_front();
        match reply {
            Some(MockReply::Response { status, body }) => Ok(TransportResponse::new(status, body)),
            Some(MockReply::ConnectionError(message)) => Err(AuditTrailError::connection(message)),
            Some(MockReply::Timeout) => {
                Err(AuditTrailError::connection("request timed out").with_timeout())
            },
            None => Err(AuditTrailError::connection(
                "MockTransport: no more replies queued",
            )),
        }
    }
}

/// Builder preset for tests: local URL, zero retry delay, given transport.
#[must_use]
pub fn mock_builder(transport: &Arc<MockTransport>) -> ClientBuilder {
    let mut builder = ClientBuilder::new();
    builder
        .server_url("http://audit.test")
        .api_key("test-api-key")
        .retry_delay(Duration::ZERO)
        .transport(Arc::clone(transport) as Arc<dyn Transport>);
    builder
}

/// Async client wired to `transport` with default retry count and no delay.
///
/// # Panics
///
/// Panics if the preset configuration is rejected.
#[must_use]
pub fn mock_client(transport: &Arc<MockTransport>) -> AuditTrailClient {
    mock_builder(transport)
        .build()
        .expect("mock client configuration is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let transport = MockTransport::new(vec![
            MockReply::json(201, json!({"id": "a"})),
            MockReply::status(404),
        ]);
        let first = transport
            .send(TransportRequest::get(["one"]))
            .await
            .unwrap();
        assert_eq!(first.status, 201);
        let second = transport
            .send(TransportRequest::get(["two"]))
            .await
            .unwrap();
        assert_eq!(second.status, 404);
        assert!(second.body.is_empty());
        let err = transport
            .send(TransportRequest::get(["three"]))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(transport.call_count(), 3);
        assert_eq!(transport.last_request().unwrap().path(), "/three");
    }

    #[tokio::test]
    async fn test_timeout_reply() {
        let transport = MockTransport::new(vec![MockReply::timeout()]);
        let err = transport
            .send(TransportRequest::get(["x"]))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
