//! Environment-driven configuration.
//!
//! Every [`RegistryServerConfig`] field maps to `AGENTCY_REGISTRY_<FIELD>`:
//!   - `AGENTCY_REGISTRY_HOST`                  (default `0.0.0.0`)
//!   - `AGENTCY_REGISTRY_PORT`                  (default `6900`)
//!   - `AGENTCY_REGISTRY_VALKEY_URL`            (optional, unset = memory-only)
//!   - `AGENTCY_REGISTRY_VALKEY_DATABASE`       (default `agentcy`)
//!   - `AGENTCY_REGISTRY_STORE_TIMEOUT_MS`      (default `5000`)
//!   - `AGENTCY_REGISTRY_MIRROR_QUEUE_CAPACITY` (default `1024`)

use anyhow::{Context, Result};

use agentcy_common::RegistryServerConfig;

use crate::state::MirrorSettings;

pub const ENV_PREFIX: &str = "AGENTCY_REGISTRY_";

pub fn from_env() -> Result<RegistryServerConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env()
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}

/// Same as [`from_env`] but reads from an explicit set of variables.
pub fn from_vars<I>(vars: I) -> Result<RegistryServerConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter(vars)
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}

#[must_use]
pub fn mirror_settings(config: &RegistryServerConfig) -> MirrorSettings {
    MirrorSettings {
        queue_capacity: config.mirror_queue_capacity,
        timeout: config.store_timeout(),
    }
}
