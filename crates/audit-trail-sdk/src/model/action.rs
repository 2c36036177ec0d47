//! What was done.

use serde::{Deserialize, Serialize};

use super::Violations;
use crate::error::AuditTrailResult;

/// The operation performed on a resource.
///
/// The action type is open-ended; the well-known verbs are available both as
/// constants and as infallible factories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
}

impl Action {
    /// Resource creation.
    pub const CREATE: &'static str = "CREATE";
    /// Resource read.
    pub const READ: &'static str = "READ";
    /// Resource update.
    pub const UPDATE: &'static str = "UPDATE";
    /// Resource deletion.
    pub const DELETE: &'static str = "DELETE";
    /// Session start.
    pub const LOGIN: &'static str = "LOGIN";
    /// Session end.
    pub const LOGOUT: &'static str = "LOGOUT";

    fn fixed(action_type: &str) -> Self {
        Self {
            action_type: action_type.to_string(),
            description: None,
            category: None,
        }
    }

    /// Create an action with an arbitrary type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if `action_type` is blank.
    pub fn of(action_type: impl Into<String>) -> AuditTrailResult<Self> {
        let action = Self {
            action_type: action_type.into(),
            description: None,
            category: None,
        };
        action.validate()?;
        Ok(action)
    }

    /// `CREATE` action.
    #[must_use]
    pub fn create() -> Self {
        Self::fixed(Self::CREATE)
    }

    /// `READ` action.
    #[must_use]
    pub fn read() -> Self {
        Self::fixed(Self::READ)
    }

    /// `UPDATE` action.
    #[must_use]
    pub fn update() -> Self {
        Self::fixed(Self::UPDATE)
    }

    /// `DELETE` action.
    #[must_use]
    pub fn delete() -> Self {
        Self::fixed(Self::DELETE)
    }

    /// `LOGIN` action, described as "User login".
    #[must_use]
    pub fn login() -> Self {
        Self::fixed(Self::LOGIN).with_description("User login")
    }

    /// `LOGOUT` action, described as "User logout".
    #[must_use]
    pub fn logout() -> Self {
        Self::fixed(Self::LOGOUT).with_description("User logout")
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the category.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Action type, e.g. `"CREATE"`.
    #[must_use]
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Description, if set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Category, if set.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.extend(self.violations());
        violations.finish("invalid action")
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require("action.type", &self.action_type);
        violations.into_vec()
    }
}
