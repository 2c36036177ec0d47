//! Audit Trail SDK - client for a remote audit trail service.
//!
//! This crate provides:
//! - A validated value model for audit events (actor, action, resource,
//!   metadata)
//! - An async [`AuditTrailClient`] and a [`BlockingClient`] facade
//! - Single and batch submission, lookup by id, and tenant-scoped search
//! - Retries with fixed or exponential delay for transport failures
//! - A typed error taxonomy separating connection, API and validation
//!   failures
//!
//! # Example
//!
//! ```rust,no_run
//! use audit_trail_sdk::prelude::*;
//!
//! # async fn example() -> AuditTrailResult<()> {
//! let client = AuditTrailClient::builder()
//!     .server_url("http://localhost:8080")
//!     .api_key("your-api-key")
//!     .build()?;
//!
//! let event = Event::create(
//!     Actor::user("user-123")?.with_name("John Doe"),
//!     Action::create().with_description("Created document"),
//!     Resource::document("doc-456")?.with_name("Q4 Report.pdf"),
//!     EventMetadata::create("web-app", "tenant-001")?.with_correlation_id("req-789"),
//! )?;
//!
//! let stored = client.log(&event).await?;
//! println!("stored {} ({})", stored.id, stored.hash);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod blocking;
mod client;
mod config;
mod error;
mod model;
mod retry;
mod settings;
mod transport;

pub use blocking::BlockingClient;
pub use client::AuditTrailClient;
pub use config::{ClientBuilder, ClientConfig, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use error::{AuditTrailError, AuditTrailResult, BoxedCause, ErrorKind};
pub use model::{
    Action, Actor, ActorType, Attributes, BatchItemError, BatchResponse, Event, EventMetadata,
    EventResponse, PagedResult, Resource, SearchCriteria, StoredEvent,
};
pub use model::{DEFAULT_PAGE_SIZE, MAX_FILTERED_PAGE_SIZE, MAX_PAGE_SIZE};
pub use retry::{
    DEFAULT_MAX_DELAY, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryOutcome, RetryPolicy,
    retry,
};
pub use settings::ClientSettings;
pub use transport::{
    API_KEY_HEADER, Method, ReqwestTransport, Transport, TransportRequest, TransportResponse,
};
