//! What was acted upon.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attributes, Violations, collect_attributes};
use crate::error::AuditTrailResult;

/// The entity an action was performed on, with optional state snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after: Option<Attributes>,
}

impl Resource {
    /// Document resources.
    pub const DOCUMENT: &'static str = "DOCUMENT";
    /// User account resources.
    pub const USER: &'static str = "USER";
    /// Financial transaction resources.
    pub const TRANSACTION: &'static str = "TRANSACTION";
    /// File resources.
    pub const FILE: &'static str = "FILE";

    /// Create a resource of an arbitrary type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `id` or
    /// `resource_type` is blank.
    pub fn of(id: impl Into<String>, resource_type: impl Into<String>) -> AuditTrailResult<Self> {
        let resource = Self {
            id: id.into(),
            resource_type: resource_type.into(),
            name: None,
            before: None,
            after: None,
        };
        resource.validate()?;
        Ok(resource)
    }

    /// Create a `DOCUMENT` resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `id` is blank.
    pub fn document(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::of(id, Self::DOCUMENT)
    }

    /// Create a `USER` resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `id` is blank.
    pub fn user(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::of(id, Self::USER)
    }

    /// Create a `TRANSACTION` resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `id` is blank.
    pub fn transaction(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::of(id, Self::TRANSACTION)
    }

    /// Create a `FILE` resource.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `id` is blank.
    pub fn file(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::of(id, Self::FILE)
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the state snapshot taken before the action.
    #[must_use]
    pub fn with_before<I, K, V>(mut self, snapshot: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.before = Some(collect_attributes(snapshot));
        self
    }

    /// Set the state snapshot taken after the action.
    #[must_use]
    pub fn with_after<I, K, V>(mut self, snapshot: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.after = Some(collect_attributes(snapshot));
        self
    }

    /// Resource identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resource type, e.g. `"DOCUMENT"`.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Display name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Snapshot before the action, if set.
    #[must_use]
    pub fn before(&self) -> Option<&Attributes> {
        self.before.as_ref()
    }

    /// Snapshot after the action, if set.
    #[must_use]
    pub fn after(&self) -> Option<&Attributes> {
        self.after.as_ref()
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.extend(self.violations());
        violations.finish("invalid resource")
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require("resource.id", &self.id);
        violations.require("resource.type", &self.resource_type);
        violations.into_vec()
    }
}
