//! Audit Trail Test - shared test utilities for the audit trail SDK.
//!
//! Provides a scripted [`MockTransport`] and event fixtures so client
//! behaviour can be exercised without a running service.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use audit_trail_test::{MockReply, MockTransport, event_response_json, mock_client, sample_event};
//!
//! # async fn example() {
//! let transport = Arc::new(MockTransport::new(vec![MockReply::json(
//!     201,
//!     event_response_json("evt-1"),
//! )]));
//! let client = mock_client(&transport);
//! let response = client.log(&sample_event()).await.unwrap();
//! assert_eq!(response.id, "evt-1");
//! assert_eq!(transport.call_count(), 1);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mock_transport;

pub use fixtures::*;
pub use mock_transport::*;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
