//! File and environment backed client settings.
//!
//! Settings mirror the builder options and load from TOML:
//!
//! ```toml
//! server_url = "https://audit.example.com"
//! api_key = "secret"
//! timeout_secs = 10
//! retry_attempts = 5
//! retry_delay_ms = 500
//!
//! [headers]
//! X-Tenant = "acme"
//! ```
//!
//! Environment variables are a fallback: they only fill fields the file left
//! unset.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientBuilder;
use crate::error::{AuditTrailError, AuditTrailResult};

/// Serializable mirror of [`ClientBuilder`] options. Every field is optional.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Service base URL.
    pub server_url: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<f64>,
    /// Retries after the first attempt.
    pub retry_attempts: Option<u32>,
    /// Delay before each retry, in milliseconds.
    pub retry_delay_ms: Option<u64>,
    /// Backoff multiplier.
    pub retry_backoff: Option<f64>,
    /// Custom headers.
    pub headers: HashMap<String, String>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("server_url", &self.server_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("retry_backoff", &self.retry_backoff)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Copy)]
enum Field {
    ServerUrl,
    ApiKey,
    TimeoutSecs,
    RetryAttempts,
    RetryDelayMs,
}

/// Mapping from environment variable name to settings field.
struct EnvMapping {
    var_name: &'static str,
    field: Field,
}

const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "AUDIT_TRAIL_SERVER_URL",
        field: Field::ServerUrl,
    },
    EnvMapping {
        var_name: "AUDIT_TRAIL_API_KEY",
        field: Field::ApiKey,
    },
    EnvMapping {
        var_name: "AUDIT_TRAIL_TIMEOUT_SECS",
        field: Field::TimeoutSecs,
    },
    EnvMapping {
        var_name: "AUDIT_TRAIL_RETRY_ATTEMPTS",
        field: Field::RetryAttempts,
    },
    EnvMapping {
        var_name: "AUDIT_TRAIL_RETRY_DELAY_MS",
        field: Field::RetryDelayMs,
    },
];

fn parse_env<T: std::str::FromStr>(var_name: &str, raw: &str) -> AuditTrailResult<T>
where
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AuditTrailError::validation(format!("invalid value for {var_name}"))
            .with_violations([format!("{var_name}: {e} (got {raw:?})")])
    })
}

impl ClientSettings {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if the text is not valid TOML
    /// or a field has the wrong type.
    pub fn from_toml_str(text: &str) -> AuditTrailResult<Self> {
        toml::from_str(text).map_err(|e| {
            AuditTrailError::validation("invalid client settings")
                .with_violations([e.message().to_string()])
        })
    }

    /// Load settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if the file cannot be read or
    /// parsed.
    pub fn load(path: impl AsRef<Path>) -> AuditTrailResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AuditTrailError::validation(format!(
                "failed to read settings file {}",
                path.display()
            ))
            .with_violations([e.to_string()])
        })?;
        debug!(path = %path.display(), "Loaded client settings");
        Self::from_toml_str(&text)
    }

    /// Settings populated only from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if a numeric variable does
    /// not parse.
    pub fn from_env() -> AuditTrailResult<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let mut settings = Self::default();
        settings.apply_env_fallbacks(&env)?;
        Ok(settings)
    }

    /// Fill unset fields from `env_vars`.
    ///
    /// Returns the number of variables applied.
    ///
    /// # Errors
    ///
    /// Returns [`AuditTrailError::Validation`] if a numeric variable does
    /// not parse.
    pub fn apply_env_fallbacks<S: BuildHasher>(
        &mut self,
        env_vars: &HashMap<String, String, S>,
    ) -> AuditTrailResult<usize> {
        let mut count: usize = 0;

        for mapping in ENV_MAPPINGS {
            let Some(raw) = env_vars.get(mapping.var_name) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            let applied = match mapping.field {
                Field::ServerUrl if self.server_url.is_none() => {
                    self.server_url = Some(raw.trim().to_string());
                    true
                },
                Field::ApiKey if self.api_key.is_none() => {
                    self.api_key = Some(raw.clone());
                    true
                },
                Field::TimeoutSecs if self.timeout_secs.is_none() => {
                    self.timeout_secs = Some(parse_env(mapping.var_name, raw)?);
                    true
                },
                Field::RetryAttempts if self.retry_attempts.is_none() => {
                    self.retry_attempts = Some(parse_env(mapping.var_name, raw)?);
                    true
                },
                Field::RetryDelayMs if self.retry_delay_ms.is_none() => {
                    self.retry_delay_ms = Some(parse_env(mapping.var_name, raw)?);
                    true
                },
                _ => false,
            };

            if applied {
                debug!(var = mapping.var_name, "Applied env var fallback");
                count = count.saturating_add(1);
            }
        }

        Ok(count)
    }

    /// Layer `overrides` on top of `self`: fields set in `overrides` win,
    /// headers are merged with `overrides` winning on collision.
    #[must_use]
    pub fn merge(mut self, overrides: Self) -> Self {
        self.server_url = overrides.server_url.or(self.server_url);
        self.api_key = overrides.api_key.or(self.api_key);
        self.timeout_secs = overrides.timeout_secs.or(self.timeout_secs);
        self.retry_attempts = overrides.retry_attempts.or(self.retry_attempts);
        self.retry_delay_ms = overrides.retry_delay_ms.or(self.retry_delay_ms);
        self.retry_backoff = overrides.retry_backoff.or(self.retry_backoff);
        self.headers.extend(overrides.headers);
        self
    }

    /// Seed a [`ClientBuilder`] from these settings.
    ///
    /// # Errors
    ///
    /// See [`ClientBuilder::from_settings`].
    pub fn into_builder(self) -> AuditTrailResult<ClientBuilder> {
        ClientBuilder::from_settings(&self)
    }
}
