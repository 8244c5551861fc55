use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liveness and assignment metadata reported for an agent.
///
/// `alive` is whatever the caller last reported; the registry never probes
/// the agent itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentStatus {
    pub alive: bool,
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl AgentStatus {
    /// Status of a freshly (re-)registered agent: not alive, unassigned,
    /// no capabilities or tags.
    #[must_use]
    pub fn registered(api_url: Option<String>) -> Self {
        Self {
            alive: false,
            assigned_to: None,
            api_url,
            last_update: Utc::now(),
            capabilities: BTreeSet::new(),
            tags: BTreeSet::new(),
        }
    }
}

/// A registered agent as held in memory and in the durable store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRecord {
    pub agent_id: String,
    pub agent_url: String,
    pub status: AgentStatus,
}

impl AgentRecord {
    /// Flattened view returned by the HTTP API.
    #[must_use]
    pub fn view(&self) -> AgentView {
        AgentView {
            agent_id: self.agent_id.clone(),
            agent_url: self.agent_url.clone(),
            status: self.status.clone(),
        }
    }
}

/// Agent URL merged with its status fields into a single JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentView {
    pub agent_id: String,
    pub agent_url: String,
    #[serde(flatten)]
    pub status: AgentStatus,
}

/// A named consumer routed through a specific agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientRecord {
    pub client_name: String,
    pub api_url: String,
    pub agent_id: String,
}
