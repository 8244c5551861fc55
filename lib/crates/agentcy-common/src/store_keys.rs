/// Durable-store key segments for registry records.
///
/// Every key is namespaced by the configured database name:
/// `{database}:{segment}:{id}`.
pub mod keys {
    /// Agent records
    /// Format: {database}:agent:{agent_id}
    /// Value: JSON-serialized AgentRecord
    /// TTL: None (removed only by explicit deletion)
    pub const AGENT: &str = "agent";

    /// Client records
    /// Format: {database}:client:{client_name}
    /// Value: JSON-serialized ClientRecord
    /// TTL: None (removed explicitly or by agent cascade)
    pub const CLIENT: &str = "client";
}

pub fn agent_key(database: &str, agent_id: &str) -> String {
    format!("{database}:{}:{agent_id}", keys::AGENT)
}

pub fn client_key(database: &str, client_name: &str) -> String {
    format!("{database}:{}:{client_name}", keys::CLIENT)
}

/// SCAN pattern matching every agent key in `database`.
pub fn agent_pattern(database: &str) -> String {
    format!("{database}:{}:*", keys::AGENT)
}

/// SCAN pattern matching every client key in `database`.
pub fn client_pattern(database: &str) -> String {
    format!("{database}:{}:*", keys::CLIENT)
}
