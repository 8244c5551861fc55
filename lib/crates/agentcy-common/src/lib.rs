pub mod api;
pub mod config;
pub mod store_keys;
pub mod types;

pub use api::*;
pub use config::RegistryServerConfig;
pub use store_keys::{agent_key, agent_pattern, client_key, client_pattern, keys};
pub use types::*;
