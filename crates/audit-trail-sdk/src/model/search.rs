//! Query parameters for event search.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ActorType, Violations};
use crate::error::AuditTrailResult;

/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Largest page size the filtered search endpoint accepts.
pub const MAX_FILTERED_PAGE_SIZE: u32 = 100;

/// Page size used when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filters and paging for [`crate::AuditTrailClient::search`].
///
/// Only `tenant_id` is mandatory; unset filters are omitted from the query.
///
/// The event listing (`GET /api/v1/events`) only filters by actor, time
/// window and free text. Criteria that also filter by actor type, action
/// type or resource go to `POST /api/v1/search` instead, which caps the page
/// size at [`MAX_FILTERED_PAGE_SIZE`]; see [`Self::uses_search_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    /// Tenant whose events are searched.
    #[serde(alias = "tenant_id")]
    pub tenant_id: String,
    /// Restrict to one actor.
    #[serde(default, alias = "actor_id", skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// Restrict to one actor kind.
    #[serde(default, alias = "actor_type", skip_serializing_if = "Option::is_none")]
    pub actor_type: Option<ActorType>,
    /// Restrict to one action type.
    #[serde(default, alias = "action_type", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    /// Restrict to one resource.
    #[serde(default, alias = "resource_id", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Restrict to one resource type.
    #[serde(default, alias = "resource_type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Inclusive lower bound on the storage timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the storage timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
    /// Free-text query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Zero-based page index.
    #[serde(default)]
    pub page: u32,
    /// Page size.
    #[serde(default = "default_size")]
    pub size: u32,
}

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SearchCriteria {
    /// Criteria matching every event of `tenant_id`, first page.
    #[must_use]
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: None,
            actor_type: None,
            action_type: None,
            resource_id: None,
            resource_type: None,
            from: None,
            to: None,
            query: None,
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the actor filter.
    #[must_use]
    pub fn actor_id(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the actor kind filter.
    #[must_use]
    pub fn actor_type(mut self, actor_type: ActorType) -> Self {
        self.actor_type = Some(actor_type);
        self
    }

    /// Set the action type filter.
    #[must_use]
    pub fn action_type(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    /// Set the resource filter.
    #[must_use]
    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Set the resource type filter.
    #[must_use]
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Set the time window. Either bound may be open.
    #[must_use]
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Set the free-text query.
    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the page index.
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Whether a filter is set that only the search endpoint honours.
    #[must_use]
    pub fn uses_search_endpoint(&self) -> bool {
        self.actor_type.is_some()
            || self.action_type.is_some()
            || self.resource_id.is_some()
            || self.resource_type.is_some()
    }

    /// Check the criteria before they are sent.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AuditTrailError::Validation`] listing every violation.
    pub fn validate(&self) -> AuditTrailResult<()> {
        let mut violations = Violations::new();
        violations.require("tenantId", &self.tenant_id);
        let max_size = if self.uses_search_endpoint() {
            MAX_FILTERED_PAGE_SIZE
        } else {
            MAX_PAGE_SIZE
        };
        if self.size == 0 || self.size > max_size {
            violations.push(format!(
                "size must be between 1 and {max_size} (got {})",
                self.size
            ));
        }
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            violations.push("from must not be after to");
        }
        violations.finish("invalid search criteria")
    }

    /// Query-string pairs for the event listing, camelCase, unset filters
    /// omitted. Only the filters the listing binds are included.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("tenantId", self.tenant_id.clone())];
        let optional = [
            ("actorId", self.actor_id.clone()),
            ("from", self.from.map(format_instant)),
            ("to", self.to.map(format_instant)),
            ("query", self.query.clone()),
        ];
        pairs.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v))),
        );
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }

    /// JSON body for the search endpoint. The time window is sent as
    /// `fromDate`/`toDate`.
    #[must_use]
    pub fn to_search_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("tenantId".into(), Value::from(self.tenant_id.as_str()));
        let optional = [
            ("actorId", self.actor_id.clone()),
            ("actorType", self.actor_type.map(|t| t.as_str().to_string())),
            ("actionType", self.action_type.clone()),
            ("resourceId", self.resource_id.clone()),
            ("resourceType", self.resource_type.clone()),
            ("query", self.query.clone()),
            ("fromDate", self.from.map(format_instant)),
            ("toDate", self.to.map(format_instant)),
        ];
        body.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::from(v)))),
        );
        body.insert("page".into(), Value::from(self.page));
        body.insert("size".into(), Value::from(self.size));
        Value::Object(body)
    }
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
