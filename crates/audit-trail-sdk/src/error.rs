//! Error taxonomy for audit trail operations.
//!
//! Every failure surfaced by the SDK is an [`AuditTrailError`]. Callers match
//! on the variant (or on [`ErrorKind`]) instead of parsing messages:
//!
//! - [`AuditTrailError::Connection`]: the transport could not complete the
//!   exchange (DNS, TCP, TLS, timeout). The only retryable kind.
//! - [`AuditTrailError::Api`]: the service answered with a non-2xx status.
//! - [`AuditTrailError::Validation`]: the payload (or configuration) broke a
//!   schema constraint, either locally or as reported by the service.

use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

/// Boxed underlying cause of a connection failure.
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that can occur while talking to the audit trail service.
#[derive(Debug, Error)]
pub enum AuditTrailError {
    /// The transport could not complete the request.
    #[error("{message}")]
    Connection {
        /// Human-readable message.
        message: String,
        /// Whether the failure was the configured timeout elapsing.
        timeout: bool,
        /// Underlying transport error, if any.
        #[source]
        cause: Option<BoxedCause>,
    },

    /// The service responded with a failure status.
    #[error("{message}")]
    Api {
        /// Human-readable message.
        message: String,
        /// HTTP status code returned by the service.
        status_code: u16,
        /// Parsed error body, absent when the body was empty or not JSON.
        body: Option<Value>,
    },

    /// The payload failed local or server-side schema validation.
    #[error("{message}")]
    Validation {
        /// Human-readable message.
        message: String,
        /// One entry per violated field-level constraint, in detection order.
        violations: Vec<String>,
    },
}

/// Discriminant of an [`AuditTrailError`], for cheap matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`AuditTrailError::Connection`].
    Connection,
    /// See [`AuditTrailError::Api`].
    Api,
    /// See [`AuditTrailError::Validation`].
    Validation,
}

impl AuditTrailError {
    /// Create a connection error with only a message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            timeout: false,
            cause: None,
        }
    }

    /// Create an API error with a message and status code.
    #[must_use]
    pub fn api(message: impl Into<String>, status_code: u16) -> Self {
        Self::Api {
            message: message.into(),
            status_code,
            body: None,
        }
    }

    /// Create a validation error with only a message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Attach an underlying cause. No-op for non-connection errors.
    #[must_use]
    pub fn with_cause(mut self, source: impl Into<BoxedCause>) -> Self {
        if let Self::Connection { cause, .. } = &mut self {
            *cause = Some(source.into());
        }
        self
    }

    /// Mark a connection error as a timeout. No-op for other kinds.
    #[must_use]
    pub fn with_timeout(mut self) -> Self {
        if let Self::Connection { timeout, .. } = &mut self {
            *timeout = true;
        }
        self
    }

    /// Attach a parsed error body. No-op for non-API errors.
    #[must_use]
    pub fn with_body(mut self, value: Value) -> Self {
        if let Self::Api { body, .. } = &mut self {
            *body = Some(value);
        }
        self
    }

    /// Attach violation descriptions. No-op for non-validation errors.
    #[must_use]
    pub fn with_violations<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Self::Validation { violations, .. } = &mut self {
            *violations = items.into_iter().map(Into::into).collect();
        }
        self
    }

    /// The kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Api { .. } => ErrorKind::Api,
            Self::Validation { .. } => ErrorKind::Validation,
        }
    }

    /// The message supplied at construction.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Connection { message, .. }
            | Self::Api { message, .. }
            | Self::Validation { message, .. } => message,
        }
    }

    /// Whether the retry policy may re-attempt the failed request.
    ///
    /// Only transport failures are transient. API rejections and validation
    /// failures are terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Whether this is a connection error caused by the request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Connection { timeout: true, .. })
    }

    /// HTTP status code, for API errors.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Parsed error body, for API errors that carried one.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Api { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Violation descriptions. Empty for non-validation errors.
    #[must_use]
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Whether this is an API error with a 4xx status.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code()
            .is_some_and(|code| (400..500).contains(&code))
    }

    /// Whether this is an API error with a 5xx status.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code()
            .is_some_and(|code| (500..600).contains(&code))
    }
}

/// Result type for audit trail operations.
pub type AuditTrailResult<T> = Result<T, AuditTrailError>;
