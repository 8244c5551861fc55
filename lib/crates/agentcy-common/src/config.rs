use serde::Deserialize;
use std::time::Duration;

/// Registry server configuration.
///
/// Loaded by the server from `AGENTCY_REGISTRY_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryServerConfig {
    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// Listening port (default: 6900)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Durable-store connection URL. Unset or empty disables persistence.
    #[serde(default)]
    pub valkey_url: Option<String>,

    /// Durable-store database name, used as the key namespace.
    #[serde(default = "default_database")]
    pub valkey_database: String,

    /// Upper bound on connect, startup load, health ping and each mirror
    /// write, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Pending mirror writes held before new ones are dropped.
    #[serde(default = "default_mirror_queue_capacity")]
    pub mirror_queue_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6900
}

fn default_database() -> String {
    "agentcy".to_string()
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn default_mirror_queue_capacity() -> usize {
    1024
}

impl RegistryServerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The store URL, treating an empty value as unset.
    #[must_use]
    pub fn store_url(&self) -> Option<&str> {
        self.valkey_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    #[must_use]
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for RegistryServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            valkey_url: None,
            valkey_database: default_database(),
            store_timeout_ms: default_store_timeout_ms(),
            mirror_queue_capacity: default_mirror_queue_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr() {
        let cfg = RegistryServerConfig::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:6900");
    }

    #[test]
    fn default_has_no_store() {
        let cfg = RegistryServerConfig::default();
        assert!(cfg.store_url().is_none());
        assert_eq!(cfg.valkey_database, "agentcy");
        assert_eq!(cfg.store_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn empty_store_url_is_unset() {
        let cfg = RegistryServerConfig {
            valkey_url: Some("   ".to_string()),
            ..RegistryServerConfig::default()
        };
        assert!(cfg.store_url().is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: RegistryServerConfig =
            serde_json::from_str(r#"{"port":7000,"valkey_url":"redis://valkey:6379"}"#).unwrap();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:7000");
        assert_eq!(cfg.store_url(), Some("redis://valkey:6379"));
        assert_eq!(cfg.mirror_queue_capacity, 1024);
    }
}
