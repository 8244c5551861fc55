//! In-memory agent and client directory.
//!
//! Pure data structure with no I/O or locking; [`crate::state::AppState`]
//! owns one behind a lock and mirrors its mutations to the durable store.

use std::collections::BTreeMap;

use chrono::Utc;

use agentcy_common::{
    AgentRecord, AgentRegistration, AgentStatus, ClientRecord, ClientRegistration, LookupResponse,
    SearchQuery, StatusUpdate,
};

use crate::error::RegistryError;

/// Aggregate counts reported by `/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryCounts {
    pub total_agents: usize,
    pub alive_agents: usize,
    pub total_clients: usize,
}

/// Agents keyed by id and clients keyed by name.
///
/// Ordered maps keep listing and search output stable.
#[derive(Debug, Default)]
pub struct Directory {
    agents: BTreeMap<String, AgentRecord>,
    clients: BTreeMap<String, ClientRecord>,
}

impl Directory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a directory from records loaded out of the durable store.
    /// Later duplicates of the same key win.
    pub fn from_records(
        agents: impl IntoIterator<Item = AgentRecord>,
        clients: impl IntoIterator<Item = ClientRecord>,
    ) -> Self {
        Self {
            agents: agents
                .into_iter()
                .map(|a| (a.agent_id.clone(), a))
                .collect(),
            clients: clients
                .into_iter()
                .map(|c| (c.client_name.clone(), c))
                .collect(),
        }
    }

    /// Insert or overwrite an agent, resetting its status.
    pub fn register(&mut self, registration: AgentRegistration) -> &AgentRecord {
        let record = AgentRecord {
            agent_id: registration.agent_id.clone(),
            agent_url: registration.agent_url,
            status: AgentStatus::registered(registration.api_url),
        };
        self.agents.insert(registration.agent_id.clone(), record);
        &self.agents[&registration.agent_id]
    }

    /// Insert or overwrite a client. The referenced agent must exist now;
    /// nothing keeps checking afterwards.
    pub fn register_client(
        &mut self,
        registration: ClientRegistration,
    ) -> Result<&ClientRecord, RegistryError> {
        if !self.agents.contains_key(&registration.agent_id) {
            return Err(RegistryError::AgentNotFound(registration.agent_id));
        }
        let name = registration.client_name.clone();
        self.clients.insert(
            name.clone(),
            ClientRecord {
                client_name: registration.client_name,
                api_url: registration.api_url,
                agent_id: registration.agent_id,
            },
        );
        Ok(&self.clients[&name])
    }

    /// Resolve `id` as an agent first, then as a client name.
    pub fn lookup(&self, id: &str) -> Result<LookupResponse, RegistryError> {
        if let Some(agent) = self.agents.get(id) {
            return Ok(LookupResponse {
                agent_id: agent.agent_id.clone(),
                agent_url: agent.agent_url.clone(),
                api_url: agent.status.api_url.clone(),
            });
        }

        let client = self
            .clients
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        let agent = self
            .agents
            .get(&client.agent_id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        Ok(LookupResponse {
            agent_id: agent.agent_id.clone(),
            agent_url: agent.agent_url.clone(),
            api_url: Some(client.api_url.clone()),
        })
    }

    pub fn agent(&self, agent_id: &str) -> Result<&AgentRecord, RegistryError> {
        self.agents
            .get(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound(agent_id.to_string()))
    }

    /// Agent id → agent URL for every agent.
    #[must_use]
    pub fn agent_urls(&self) -> BTreeMap<String, String> {
        self.agents
            .values()
            .map(|a| (a.agent_id.clone(), a.agent_url.clone()))
            .collect()
    }

    pub fn client_names(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<&AgentRecord> {
        self.agents
            .values()
            .filter(|agent| matches_query(agent, query))
            .collect()
    }

    /// Merge the provided fields into the agent's status and refresh
    /// `last_update`.
    pub fn update_status(
        &mut self,
        agent_id: &str,
        update: StatusUpdate,
    ) -> Result<&AgentRecord, RegistryError> {
        let agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| RegistryError::AgentNotFound(agent_id.to_string()))?;

        let status = &mut agent.status;
        if let Some(alive) = update.alive {
            status.alive = alive;
        }
        if let Some(assigned_to) = update.assigned_to {
            status.assigned_to = assigned_to;
        }
        if let Some(capabilities) = update.capabilities {
            status.capabilities = capabilities;
        }
        if let Some(tags) = update.tags {
            status.tags = tags;
        }
        status.last_update = Utc::now();

        Ok(&*agent)
    }

    /// Remove an agent and every client mapped to it. Returns the removed
    /// client names.
    pub fn delete_agent(&mut self, agent_id: &str) -> Result<Vec<String>, RegistryError> {
        if self.agents.remove(agent_id).is_none() {
            return Err(RegistryError::AgentNotFound(agent_id.to_string()));
        }

        let orphaned: Vec<String> = self
            .clients
            .values()
            .filter(|c| c.agent_id == agent_id)
            .map(|c| c.client_name.clone())
            .collect();
        for name in &orphaned {
            self.clients.remove(name);
        }
        Ok(orphaned)
    }

    pub fn delete_client(&mut self, client_name: &str) -> Result<ClientRecord, RegistryError> {
        self.clients
            .remove(client_name)
            .ok_or_else(|| RegistryError::ClientNotFound(client_name.to_string()))
    }

    #[must_use]
    pub fn counts(&self) -> DirectoryCounts {
        DirectoryCounts {
            total_agents: self.agents.len(),
            alive_agents: self.agents.values().filter(|a| a.status.alive).count(),
            total_clients: self.clients.len(),
        }
    }
}

fn matches_query(agent: &AgentRecord, query: &SearchQuery) -> bool {
    if let Some(text) = &query.text
        && !agent
            .agent_id
            .to_lowercase()
            .contains(&text.to_lowercase())
    {
        return false;
    }
    if !query.capabilities.is_empty()
        && query.capabilities.is_disjoint(&agent.status.capabilities)
    {
        return false;
    }
    if !query.tags.is_empty() && query.tags.is_disjoint(&agent.status.tags) {
        return false;
    }
    true
}
