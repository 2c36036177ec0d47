//! Prelude module - commonly used types for convenient import.
//!
//! Use `use audit_trail_sdk::prelude::*;` to import all essential types.

pub use crate::{
    Action, Actor, ActorType, AuditTrailClient, AuditTrailError, AuditTrailResult, BatchResponse,
    BlockingClient, ClientBuilder, ErrorKind, Event, EventMetadata, EventResponse, PagedResult,
    Resource, SearchCriteria, StoredEvent,
};
