//! Value model for audit events.
//!
//! Request-side values ([`Actor`], [`Action`], [`Resource`], [`EventMetadata`],
//! [`Event`]) are built through factories that validate required fields and
//! report every violated constraint at once. Fields are private; optional
//! ones are set through consuming `with_*` methods, so a value never changes
//! behind the back of whoever holds it.
//!
//! On the wire every type uses camelCase names. Deserialization also accepts
//! the snake_case spelling so responses echoing either form round-trip.

mod action;
mod actor;
mod event;
mod metadata;
mod resource;
mod response;
mod search;

pub use action::Action;
pub use actor::{Actor, ActorType};
pub use event::Event;
pub use metadata::EventMetadata;
pub use resource::Resource;
pub use response::{BatchItemError, BatchResponse, EventResponse, PagedResult, StoredEvent};
pub use search::{DEFAULT_PAGE_SIZE, MAX_FILTERED_PAGE_SIZE, MAX_PAGE_SIZE, SearchCriteria};

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{AuditTrailError, AuditTrailResult};

/// Free-form string-to-JSON mapping used for attributes, snapshots and extras.
pub type Attributes = HashMap<String, Value>;

/// Accumulates constraint violations for one value.
#[derive(Debug, Default)]
pub(crate) struct Violations(Vec<String>);

impl Violations {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `"{field} is required"` when `value` is blank.
    pub(crate) fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.0.push(format!("{field} is required"));
        }
    }

    pub(crate) fn push(&mut self, violation: impl Into<String>) {
        self.0.push(violation.into());
    }

    pub(crate) fn extend(&mut self, violations: impl IntoIterator<Item = String>) {
        self.0.extend(violations);
    }

    pub(crate) fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Fail with a validation error carrying every recorded violation.
    pub(crate) fn finish(self, message: &str) -> AuditTrailResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AuditTrailError::validation(message).with_violations(self.0))
        }
    }
}

/// Collect `(key, value)` pairs into an [`Attributes`] map.
pub(crate) fn collect_attributes<I, K, V>(entries: I) -> Attributes
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
