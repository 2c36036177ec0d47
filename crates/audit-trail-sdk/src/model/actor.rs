//! Who performed an audited action.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Attributes, Violations, collect_attributes};
use crate::error::{AuditTrailError, AuditTrailResult};

/// Kind of identity behind an [`Actor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ActorType {
    /// A human user.
    User,
    /// The platform itself (schedulers, migrations).
    System,
    /// Another service acting on its own behalf.
    Service,
}

impl ActorType {
    /// Wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::System => "SYSTEM",
            Self::Service => "SERVICE",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorType {
    type Err = AuditTrailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Self::User),
            "SYSTEM" => Ok(Self::System),
            "SERVICE" => Ok(Self::Service),
            other => Err(AuditTrailError::validation(format!("unknown actor type: {other}"))
                .with_violations([format!(
                    "actor.type must be one of USER, SYSTEM, SERVICE (got {other:?})"
                )])),
        }
    }
}

impl TryFrom<String> for ActorType {
    type Error = AuditTrailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// The identity that performed an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    id: String,
    #[serde(rename = "type")]
    actor_type: ActorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
    #[serde(default, alias = "user_agent", skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Attributes>,
}

impl Actor {
    /// Create an actor of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if `id` is blank.
    pub fn new(id: impl Into<String>, actor_type: ActorType) -> AuditTrailResult<Self> {
        let actor = Self {
            id: id.into(),
            actor_type,
            name: None,
            ip: None,
            user_agent: None,
            attributes: None,
        };
        actor.validate()?;
        Ok(actor)
    }

    /// Create a user actor.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if `id` is blank.
    pub fn user(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::new(id, ActorType::User)
    }

    /// Create a system actor.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if `id` is blank.
    pub fn system(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::new(id, ActorType::System)
    }

    /// Create a service actor.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if `id` is blank.
    pub fn service(id: impl Into<String>) -> AuditTrailResult<Self> {
        Self::new(id, ActorType::Service)
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the originating IP address.
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Replace the free-form attributes.
    #[must_use]
    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.attributes = Some(collect_attributes(attributes));
        self
    }

    /// Actor identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Actor kind.
    #[must_use]
    pub fn actor_type(&self) -> ActorType {
        self.actor_type
    }

    /// Display name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Originating IP address, if set.
    #[must_use]
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// User agent, if set.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Free-form attributes, if set.
    #[must_use]
    pub fn attributes(&self) -> Option<&Attributes> {
        self.attributes.as_ref()
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.extend(self.violations());
        violations.finish("invalid actor")
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require("actor.id", &self.id);
        violations.into_vec()
    }
}
