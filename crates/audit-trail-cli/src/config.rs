//! Resolve client settings from flags, the config file and the environment.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use anyhow::Context;
use audit_trail_sdk::ClientSettings;
use directories::BaseDirs;
use tracing::debug;

/// Default config file: `<config_dir>/audit-trail/config.toml`.
pub(crate) fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("audit-trail").join("config.toml"))
}

/// Resolve settings against the process environment.
pub(crate) fn resolve(
    flags: ClientSettings,
    config_path: Option<&Path>,
) -> anyhow::Result<ClientSettings> {
    let env: HashMap<String, String> = std::env::vars().collect();
    resolve_with_env(flags, config_path, default_config_path().as_deref(), &env)
}

/// Precedence: flags, then the config file, then environment variables.
///
/// An explicit `config_path` must exist. The default path is optional.
pub(crate) fn resolve_with_env<S: BuildHasher>(
    flags: ClientSettings,
    config_path: Option<&Path>,
    default_path: Option<&Path>,
    env: &HashMap<String, String, S>,
) -> anyhow::Result<ClientSettings> {
    let file = match (config_path, default_path) {
        (Some(path), _) => ClientSettings::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, Some(path)) if path.is_file() => ClientSettings::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        _ => ClientSettings::default(),
    };

    let mut settings = file.merge(flags);
    let applied = settings.apply_env_fallbacks(env)?;
    debug!(applied, "Resolved client settings");
    Ok(settings)
}
