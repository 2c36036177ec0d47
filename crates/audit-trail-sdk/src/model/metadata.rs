//! Provenance and tenancy of an event.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Attributes, Violations, collect_attributes};
use crate::error::AuditTrailResult;

/// Where an event came from and which tenant owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    source: String,
    #[serde(alias = "tenant_id")]
    tenant_id: String,
    #[serde(default, alias = "correlation_id", skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, alias = "session_id", skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extra: Option<Attributes>,
}

impl EventMetadata {
    /// Create metadata for an event emitted by `source` on behalf of `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] if either field is blank.
    pub fn create(source: impl Into<String>, tenant_id: impl Into<String>) -> AuditTrailResult<Self> {
        let metadata = Self {
            source: source.into(),
            tenant_id: tenant_id.into(),
            correlation_id: None,
            session_id: None,
            tags: None,
            extra: None,
        };
        metadata.validate()?;
        Ok(metadata)
    }

    /// Set the correlation identifier.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the session identifier.
    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags<I, K, V>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tags = Some(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Add a single tag, keeping existing ones.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the free-form extra fields.
    #[must_use]
    pub fn with_extra<I, K, V>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.extra = Some(collect_attributes(extra));
        self
    }

    /// Emitting system.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Owning tenant.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Correlation identifier, if set.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Session identifier, if set.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Tags, if set.
    #[must_use]
    pub fn tags(&self) -> Option<&HashMap<String, String>> {
        self.tags.as_ref()
    }

    /// Extra fields, if set.
    #[must_use]
    pub fn extra(&self) -> Option<&Attributes> {
        self.extra.as_ref()
    }

    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.extend(self.violations());
        violations.finish("invalid event metadata")
    }

    pub(crate) fn violations(&self) -> Vec<String> {
        let mut violations = Violations::new();
        violations.require("metadata.source", &self.source);
        violations.require("metadata.tenantId", &self.tenant_id);
        violations.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_with_optionals() {
        let metadata = EventMetadata::create("web-app", "tenant-001")
            .unwrap()
            .with_correlation_id("corr-123")
            .with_session_id("sess-456")
            .with_tags([("env", "production")]);
        assert_eq!(metadata.source(), "web-app");
        assert_eq!(metadata.tenant_id(), "tenant-001");
        assert_eq!(metadata.correlation_id(), Some("corr-123"));
        assert_eq!(metadata.session_id(), Some("sess-456"));
        assert_eq!(
            metadata.tags().unwrap().get("env").map(String::as_str),
            Some("production")
        );
    }

    #[test]
    fn test_with_tag_accumulates() {
        let metadata = EventMetadata::create("s", "t")
            .unwrap()
            .with_tag("a", "1")
            .with_tag("b", "2");
        assert_eq!(metadata.tags().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_tenant_rejected() {
        let err = EventMetadata::create("web-app", "").unwrap_err();
        assert_eq!(err.violations(), ["metadata.tenantId is required"]);
    }

    #[test]
    fn test_wire_names() {
        let metadata = EventMetadata::create("app", "t1")
            .unwrap()
            .with_correlation_id("c")
            .with_extra([("region", json!("eu"))]);
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(
            value,
            json!({
                "source": "app",
                "tenantId": "t1",
                "correlationId": "c",
                "extra": {"region": "eu"}
            })
        );

        let snake: EventMetadata = serde_json::from_value(json!({
            "source": "app",
            "tenant_id": "t1",
            "correlation_id": "c",
            "extra": {"region": "eu"}
        }))
        .unwrap();
        assert_eq!(snake, metadata);
    }
}
