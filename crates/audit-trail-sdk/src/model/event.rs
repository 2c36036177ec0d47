//! The unit submitted to the audit service.

use serde::{Deserialize, Serialize};

use super::{Action, Actor, EventMetadata, Resource, Violations};
use crate::error::AuditTrailResult;

/// A complete audit event: who did what to which resource, and in what context.
///
/// The service assigns identity, timestamp and integrity hash on acceptance;
/// see [`crate::EventResponse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    actor: Actor,
    action: Action,
    resource: Resource,
    metadata: EventMetadata,
}

impl Event {
    /// Assemble an event from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if any part has a
    /// blank required field.
    pub fn create(
        actor: Actor,
        action: Action,
        resource: Resource,
        metadata: EventMetadata,
    ) -> AuditTrailResult<Self> {
        let event = Self {
            actor,
            action,
            resource,
            metadata,
        };
        event.validate()?;
        Ok(event)
    }

    /// Who performed the action.
    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// What was done.
    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    /// What it was done to.
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Provenance and tenancy.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Check every part, reporting all violations at once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.extend(self.violations());
        violations.finish("invalid event")
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let mut violations = self.actor.violations();
        violations.extend(self.action.violations());
        violations.extend(self.resource.violations());
        violations.extend(self.metadata.violations());
        violations
    }
}
