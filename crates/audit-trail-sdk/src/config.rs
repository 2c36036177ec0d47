//! Client configuration and its fluent builder.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use url::Url;

use crate::blocking::BlockingClient;
use crate::client::AuditTrailClient;
use crate::error::{AuditTrailError, AuditTrailResult};
use crate::retry::{DEFAULT_MAX_DELAY, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::settings::ClientSettings;
use crate::transport::{ReqwestTransport, Transport};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("audit-trail-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Frozen connection settings shared by every request of a client.
#[derive(Clone)]
pub struct ClientConfig {
    base_url: Url,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    headers: HashMap<String, String>,
    user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url())
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Service base URL without a trailing slash.
    #[must_use]
    pub fn server_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Parsed base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// API key, if configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry policy for transport failures.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Number of retries after the first attempt.
    #[must_use]
    pub fn retry_attempts(&self) -> u32 {
        self.retry.max_retries
    }

    /// Delay before the first retry.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        self.retry.initial_delay
    }

    /// Custom headers sent with every request.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// User agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

/// Fluent accumulator of client settings.
///
/// Setters mutate the builder in place and return it, so calls chain:
///
/// ```rust,no_run
/// use std::time::Duration;
/// use audit_trail_sdk::AuditTrailClient;
///
/// # fn example() -> audit_trail_sdk::AuditTrailResult<()> {
/// let client = AuditTrailClient::builder()
///     .server_url("https://audit.example.com")
///     .api_key("secret")
///     .timeout(Duration::from_secs(10))
///     .retry_attempts(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct ClientBuilder {
    server_url: Option<String>,
    api_key: Option<String>,
    timeout: Option<Duration>,
    retry_attempts: Option<u32>,
    retry_delay: Option<Duration>,
    retry_backoff: Option<f64>,
    headers: HashMap<String, String>,
    user_agent: Option<String>,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("server_url", &self.server_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("retry_backoff", &self.retry_backoff)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("user_agent", &self.user_agent)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientBuilder {
    /// Empty builder with every option at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a builder from loaded settings.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if `timeout_secs` is negative
    /// or not a number.
    pub fn from_settings(settings: &ClientSettings) -> AuditTrailResult<Self> {
        let mut builder = Self::new();
        if let Some(url) = &settings.server_url {
            builder.server_url(url.clone());
        }
        if let Some(key) = &settings.api_key {
            builder.api_key(key.clone());
        }
        if let Some(secs) = settings.timeout_secs {
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                AuditTrailError::validation(format!("timeout_secs is invalid: {e}"))
                    .with_violations([format!("timeout_secs must be a non-negative number (got {secs})")])
            })?;
            builder.timeout(timeout);
        }
        if let Some(attempts) = settings.retry_attempts {
            builder.retry_attempts(attempts);
        }
        if let Some(delay_ms) = settings.retry_delay_ms {
            builder.retry_delay(Duration::from_millis(delay_ms));
        }
        if let Some(multiplier) = settings.retry_backoff {
            builder.retry_backoff(multiplier);
        }
        builder.headers(settings.headers.clone());
        Ok(builder)
    }

    /// Service base URL. Required.
    pub fn server_url(&mut self, server_url: impl Into<String>) -> &mut Self {
        self.server_url = Some(server_url.into());
        self
    }

    /// API key sent as `X-API-Key`.
    pub fn api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Per-request timeout. Defaults to 30 seconds.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retries after the first attempt. Defaults to 3.
    pub fn retry_attempts(&mut self, attempts: u32) -> &mut Self {
        self.retry_attempts = Some(attempts);
        self
    }

    /// Delay before each retry. Defaults to 1 second.
    pub fn retry_delay(&mut self, delay: Duration) -> &mut Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Backoff multiplier applied per retry. Defaults to 1.0 (fixed delay).
    pub fn retry_backoff(&mut self, multiplier: f64) -> &mut Self {
        self.retry_backoff = Some(multiplier);
        self
    }

    /// Replace the custom headers.
    pub fn headers(&mut self, headers: HashMap<String, String>) -> &mut Self {
        self.headers = headers;
        self
    }

    /// Add one custom header.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Override the user agent.
    pub fn user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Use a custom transport instead of the default HTTP client.
    pub fn transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    /// Validate and freeze the accumulated settings.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] listing every problem, e.g.
    /// `"server_url is required"`.
    pub fn build_config(&self) -> AuditTrailResult<ClientConfig> {
        let mut violations = Vec::new();

        let base_url = match self.server_url.as_deref().map(str::trim) {
            None | Some("") => {
                violations.push("server_url is required".to_string());
                None
            },
            Some(raw) => match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Some(url),
                Ok(url) => {
                    violations.push(format!(
                        "server_url must use http or https (got {})",
                        url.scheme()
                    ));
                    None
                },
                Err(e) => {
                    violations.push(format!("server_url is not a valid URL: {e}"));
                    None
                },
            },
        };

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            violations.push("timeout must be positive".to_string());
        }

        let multiplier = self.retry_backoff.unwrap_or(1.0);
        if !multiplier.is_finite() || multiplier < 1.0 {
            violations.push(format!("retry_backoff must be at least 1.0 (got {multiplier})"));
        }

        if let Some(key) = &self.api_key
            && HeaderValue::from_str(key).is_err()
        {
            violations.push("api_key contains characters not allowed in a header".to_string());
        }

        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        if HeaderValue::from_str(&user_agent).is_err() {
            violations.push("user_agent contains characters not allowed in a header".to_string());
        }

        let mut names: Vec<_> = self.headers.keys().collect();
        names.sort();
        for name in names {
            let valid_name = HeaderName::from_bytes(name.as_bytes()).is_ok();
            let valid_value = self
                .headers
                .get(name)
                .is_some_and(|v| HeaderValue::from_str(v).is_ok());
            if !valid_name || !valid_value {
                violations.push(format!("header {name:?} is not a valid HTTP header"));
            }
        }

        let Some(base_url) = base_url.filter(|_| violations.is_empty()) else {
            return Err(AuditTrailError::validation(violations.join("; ")).with_violations(violations));
        };

        let retry = RetryPolicy::new(
            self.retry_attempts.unwrap_or(DEFAULT_RETRY_ATTEMPTS),
            self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
        )
        .with_multiplier(multiplier)
        .with_max_delay(DEFAULT_MAX_DELAY);

        Ok(ClientConfig {
            base_url,
            api_key: self.api_key.clone(),
            timeout,
            retry,
            headers: self.headers.clone(),
            user_agent,
        })
    }

    /// Build an async client.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if the settings are invalid,
    /// or [`AuditTrailError::Connection`] if the HTTP client cannot start.
    pub fn build(&self) -> AuditTrailResult<AuditTrailClient> {
        let config = self.build_config()?;
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::new(&config)?),
        };
        Ok(AuditTrailClient::with_transport(config, transport))
    }

    /// Build a blocking client with its own runtime.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`], plus [`AuditTrailError::Connection`] if the
    /// runtime cannot start.
    pub fn build_blocking(&self) -> AuditTrailResult<BlockingClient> {
        BlockingClient::new(self.build()?)
    }
}
