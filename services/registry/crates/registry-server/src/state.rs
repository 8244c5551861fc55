//! Shared application state handed to every request handler.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use agentcy_common::{
    AgentRegistration, AgentView, ClientRecord, ClientRegistration, HealthResponse,
    LookupResponse, SearchQuery, StatsResponse, StatusUpdate,
};

use crate::directory::Directory;
use crate::error::RegistryError;
use crate::persistence::{DirectoryStore, Mirror, MirrorOp};

/// Marker reported for every client by `/clients`; client liveness is not
/// tracked.
pub const CLIENT_ALIVE: &str = "alive";

/// How the durable-store mirror behaves.
#[derive(Debug, Clone, Copy)]
pub struct MirrorSettings {
    pub queue_capacity: usize,
    /// Bound on the startup load, health pings and each mirrored write.
    pub timeout: Duration,
}

/// Owns the directory. Mutations hold the write lock while they change
/// memory and enqueue their mirror op, so the store sees writes in the
/// order they were applied.
pub struct AppState {
    directory: RwLock<Directory>,
    store: Option<Arc<dyn DirectoryStore>>,
    mirror: Option<Mirror>,
    store_timeout: Duration,
}

impl AppState {
    /// Memory-only state with persistence disabled.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            directory: RwLock::new(Directory::new()),
            store: None,
            mirror: None,
            store_timeout: Duration::ZERO,
        }
    }

    /// Load the directory from `store` and start mirroring to it.
    ///
    /// A failed or timed-out load is not retried: it is logged, the store is
    /// shut down and the registry continues memory-only. The returned
    /// handle resolves once the mirror has flushed after the state is
    /// dropped.
    pub async fn bootstrap(
        store: Option<Arc<dyn DirectoryStore>>,
        settings: MirrorSettings,
    ) -> (Self, Option<JoinHandle<()>>) {
        let Some(store) = store else {
            tracing::warn!("durable store disabled, running memory-only");
            return (Self::in_memory(), None);
        };

        let snapshot = match tokio::time::timeout(settings.timeout, store.load()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                tracing::warn!(
                    error = %format!("{e:#}"),
                    "failed to load registry from durable store, running memory-only",
                );
                store.shutdown().await;
                return (Self::in_memory(), None);
            }
            Err(_) => {
                tracing::warn!(
                    timeout = ?settings.timeout,
                    "timed out loading registry from durable store, running memory-only",
                );
                store.shutdown().await;
                return (Self::in_memory(), None);
            }
        };

        tracing::info!(
            agents = snapshot.agents.len(),
            clients = snapshot.clients.len(),
            "registry rehydrated, persistence enabled",
        );

        let directory = Directory::from_records(snapshot.agents, snapshot.clients);
        let (mirror, handle) =
            Mirror::spawn(store.clone(), settings.queue_capacity, settings.timeout);

        let state = Self {
            directory: RwLock::new(directory),
            store: Some(store),
            mirror: Some(mirror),
            store_timeout: settings.timeout,
        };
        (state, Some(handle))
    }

    #[must_use]
    pub fn persistence_enabled(&self) -> bool {
        self.mirror.is_some()
    }

    fn mirror(&self, op: MirrorOp) {
        if let Some(mirror) = &self.mirror {
            mirror.submit(op);
        }
    }

    pub async fn register(&self, registration: AgentRegistration) -> AgentView {
        let mut directory = self.directory.write().await;
        let record = directory.register(registration).clone();
        self.mirror(MirrorOp::PutAgent(record.clone()));

        tracing::info!(
            agent_id = %record.agent_id,
            agent_url = %record.agent_url,
            "registered agent",
        );
        record.view()
    }

    pub async fn register_client(
        &self,
        registration: ClientRegistration,
    ) -> Result<ClientRecord, RegistryError> {
        let mut directory = self.directory.write().await;
        let record = directory.register_client(registration)?.clone();
        self.mirror(MirrorOp::PutClient(record.clone()));

        tracing::info!(
            client_name = %record.client_name,
            agent_id = %record.agent_id,
            "registered client",
        );
        Ok(record)
    }

    pub async fn lookup(&self, id: &str) -> Result<LookupResponse, RegistryError> {
        self.directory.read().await.lookup(id)
    }

    pub async fn agent_urls(&self) -> BTreeMap<String, String> {
        self.directory.read().await.agent_urls()
    }

    pub async fn clients(&self) -> BTreeMap<String, String> {
        self.directory
            .read()
            .await
            .client_names()
            .map(|name| (name.to_string(), CLIENT_ALIVE.to_string()))
            .collect()
    }

    pub async fn search(&self, query: &SearchQuery) -> Vec<AgentView> {
        self.directory
            .read()
            .await
            .search(query)
            .into_iter()
            .map(agentcy_common::AgentRecord::view)
            .collect()
    }

    pub async fn agent(&self, agent_id: &str) -> Result<AgentView, RegistryError> {
        Ok(self.directory.read().await.agent(agent_id)?.view())
    }

    pub async fn update_status(
        &self,
        agent_id: &str,
        update: StatusUpdate,
    ) -> Result<AgentView, RegistryError> {
        let mut directory = self.directory.write().await;
        let record = directory.update_status(agent_id, update)?.clone();
        self.mirror(MirrorOp::PutAgent(record.clone()));

        tracing::info!(
            agent_id,
            alive = record.status.alive,
            assigned_to = ?record.status.assigned_to,
            "updated agent status",
        );
        Ok(record.view())
    }

    /// Delete an agent and cascade to its clients. Returns the removed
    /// client names.
    pub async fn delete_agent(&self, agent_id: &str) -> Result<Vec<String>, RegistryError> {
        let mut directory = self.directory.write().await;
        let removed = directory.delete_agent(agent_id)?;
        self.mirror(MirrorOp::DeleteAgent {
            agent_id: agent_id.to_string(),
            clients: removed.clone(),
        });

        tracing::info!(agent_id, removed_clients = removed.len(), "deleted agent");
        Ok(removed)
    }

    pub async fn delete_client(&self, client_name: &str) -> Result<(), RegistryError> {
        let mut directory = self.directory.write().await;
        directory.delete_client(client_name)?;
        self.mirror(MirrorOp::DeleteClient(client_name.to_string()));

        tracing::info!(client_name, "deleted client");
        Ok(())
    }

    pub async fn stats(&self) -> StatsResponse {
        let counts = self.directory.read().await.counts();
        StatsResponse {
            total_agents: counts.total_agents,
            alive_agents: counts.alive_agents,
            total_clients: counts.total_clients,
            valkey_enabled: self.persistence_enabled(),
        }
    }

    /// Always healthy while the process serves requests; `valkey` reflects
    /// a time-bounded PING of the store.
    pub async fn health(&self) -> HealthResponse {
        let store_reachable = match &self.store {
            Some(store) => matches!(
                tokio::time::timeout(self.store_timeout, store.ping()).await,
                Ok(Ok(()))
            ),
            None => false,
        };

        HealthResponse {
            status: "healthy".to_string(),
            valkey: store_reachable,
            timestamp: Utc::now(),
        }
    }
}
