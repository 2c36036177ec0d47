//! Synchronous facade over [`AuditTrailClient`].
//!
//! A [`BlockingClient`] owns a small tokio runtime and blocks the calling
//! thread on the async implementation, so validation, retries and error
//! mapping are identical in both calling conventions.

use std::fmt;
use std::future::Future;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::client::AuditTrailClient;
use crate::config::ClientConfig;
use crate::error::{AuditTrailError, AuditTrailResult};
use crate::model::{BatchResponse, Event, EventResponse, PagedResult, SearchCriteria, StoredEvent};

/// Blocking handle to the audit trail service.
///
/// Safe to share between threads by reference or behind an `Arc`. Calls made
/// from inside an async context are driven on a scoped helper thread rather
/// than panicking.
pub struct BlockingClient {
    client: AuditTrailClient,
    runtime: Option<Runtime>,
}

impl fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl BlockingClient {
    /// Wrap an async client.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Connection`] if the runtime cannot start.
    pub fn new(client: AuditTrailClient) -> AuditTrailResult<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("audit-trail-blocking")
            .enable_all()
            .build()
            .map_err(|e| AuditTrailError::connection("failed to start blocking runtime").with_cause(e))?;

        Ok(Self {
            client,
            runtime: Some(runtime),
        })
    }

    /// The wrapped async client.
    #[must_use]
    pub fn async_client(&self) -> &AuditTrailClient {
        &self.client
    }

    /// Frozen configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.client.config()
    }

    /// Blocking [`AuditTrailClient::log`].
    ///
    /// # Errors
    ///
    /// See [`AuditTrailClient::log`].
    pub fn log(&self, event: &Event) -> AuditTrailResult<EventResponse> {
        self.block_on(self.client.log(event))
    }

    /// Blocking [`AuditTrailClient::log_batch`].
    ///
    /// # Errors
    ///
    /// See [`AuditTrailClient::log_batch`].
    pub fn log_batch(&self, events: &[Event]) -> AuditTrailResult<BatchResponse> {
        self.block_on(self.client.log_batch(events))
    }

    /// Blocking [`AuditTrailClient::get_by_id`].
    ///
    /// # Errors
    ///
    /// See [`AuditTrailClient::get_by_id`].
    pub fn get_by_id(&self, id: &str) -> AuditTrailResult<Option<StoredEvent>> {
        self.block_on(self.client.get_by_id(id))
    }

    /// Blocking [`AuditTrailClient::search`].
    ///
    /// # Errors
    ///
    /// See [`AuditTrailClient::search`].
    pub fn search(&self, criteria: &SearchCriteria) -> AuditTrailResult<PagedResult<StoredEvent>> {
        self.block_on(self.client.search(criteria))
    }

    /// Blocking [`AuditTrailClient::quick_search`].
    ///
    /// # Errors
    ///
    /// See [`AuditTrailClient::quick_search`].
    pub fn quick_search(
        &self,
        text: &str,
        tenant_id: &str,
        page: u32,
        size: u32,
    ) -> AuditTrailResult<PagedResult<StoredEvent>> {
        self.block_on(self.client.quick_search(text, tenant_id, page, size))
    }

    fn block_on<T, F>(&self, future: F) -> AuditTrailResult<T>
    where
        F: Future<Output = AuditTrailResult<T>> + Send,
        T: Send,
    {
        let Some(runtime) = self.runtime.as_ref() else {
            return Err(AuditTrailError::connection("blocking client runtime is shut down"));
        };

        if Handle::try_current().is_ok() {
            // Inside a tokio runtime: block a scoped thread instead of this one.
            std::thread::scope(|s| s.spawn(|| runtime.block_on(future)).join())
                .unwrap_or_else(|_| Err(AuditTrailError::connection("blocking call panicked")))
        } else {
            runtime.block_on(future)
        }
    }
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        // Dropping a runtime from async code panics; background shutdown does not.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
