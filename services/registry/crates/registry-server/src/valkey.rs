//! Valkey-backed [`DirectoryStore`] using the Fred client.
//!
//! Records are stored as JSON strings under
//! `{database}:agent:{agent_id}` and `{database}:client:{client_name}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fred::prelude::*;
use fred::types::scan::Scanner;
use serde::de::DeserializeOwned;

use agentcy_common::{
    AgentRecord, ClientRecord, agent_key, agent_pattern, client_key, client_pattern, keys,
};

use crate::persistence::{DirectoryStore, MirrorOp, Snapshot};

pub struct ValkeyStore {
    client: Client,
    database: String,
    timeout: Duration,
}

impl ValkeyStore {
    /// Connect and verify the server answers PING.
    ///
    /// The initial connection is attempted once; `timeout` bounds both the
    /// connect and the PING.
    pub async fn connect(url: &str, database: &str, timeout: Duration) -> Result<Self> {
        let config = Config::from_url(url).context("invalid Valkey URL")?;

        let client = Builder::from_config(config)
            .with_connection_config(|conn_config| {
                conn_config.connection_timeout = timeout;
                conn_config.internal_command_timeout = timeout;
            })
            .set_policy(ReconnectPolicy::new_exponential(0, 100, 5000, 5))
            .build()?;

        if let Err(e) = Self::handshake(&client, timeout).await {
            // Stop the background connection task before giving up.
            let _ = tokio::time::timeout(timeout, client.quit()).await;
            return Err(e);
        }

        tracing::info!(database, "Valkey connection ready");

        Ok(Self {
            client,
            database: database.to_string(),
            timeout,
        })
    }

    async fn handshake(client: &Client, timeout: Duration) -> Result<()> {
        tokio::time::timeout(timeout, client.init())
            .await
            .context("timed out connecting to Valkey")?
            .context("failed to connect to Valkey")?;

        tokio::time::timeout(timeout, client.ping::<String>(None))
            .await
            .context("Valkey startup PING timed out")?
            .context("Valkey startup PING failed")?;

        Ok(())
    }

    /// Read every record whose key matches `pattern`. Records that no longer
    /// parse are skipped so one bad entry cannot block startup.
    async fn load_records<T: DeserializeOwned>(
        &self,
        kind: &str,
        pattern: &str,
    ) -> Result<Vec<T>> {
        let matched = self.scan_keys(pattern).await?;
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Value> = self.client.mget(matched.clone()).await?;

        let records = matched
            .iter()
            .zip(values)
            .filter_map(|(key, value)| {
                let json = value.as_str()?;
                serde_json::from_str::<T>(&json)
                    .inspect_err(|e| {
                        tracing::warn!(
                            kind,
                            key = %key,
                            error = %e,
                            "skipping unreadable registry record",
                        );
                    })
                    .ok()
            })
            .collect();
        Ok(records)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        use futures::stream::TryStreamExt;

        let mut pages = self.client.scan(pattern, Some(100), None);
        let mut found = Vec::new();
        while let Some(mut page) = pages.try_next().await? {
            found.extend(
                page.take_results()
                    .into_iter()
                    .flatten()
                    .map(|key| key.as_str_lossy().into_owned()),
            );
        }
        Ok(found)
    }

    async fn put_json<T: serde::Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let json = serde_json::to_string(record)?;
        self.client
            .set::<(), _, _>(key, json, None, None, false)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DirectoryStore for ValkeyStore {
    async fn ping(&self) -> Result<()> {
        self.client.ping::<String>(None).await?;
        Ok(())
    }

    async fn load(&self) -> Result<Snapshot> {
        let agents: Vec<AgentRecord> = self
            .load_records(keys::AGENT, &agent_pattern(&self.database))
            .await
            .context("failed to load agents")?;
        let clients: Vec<ClientRecord> = self
            .load_records(keys::CLIENT, &client_pattern(&self.database))
            .await
            .context("failed to load clients")?;

        tracing::info!(
            agents = agents.len(),
            clients = clients.len(),
            "loaded registry snapshot from Valkey",
        );
        Ok(Snapshot { agents, clients })
    }

    async fn apply(&self, op: &MirrorOp) -> Result<()> {
        match op {
            MirrorOp::PutAgent(agent) => {
                self.put_json(&agent_key(&self.database, &agent.agent_id), agent)
                    .await?;
            }
            MirrorOp::PutClient(client) => {
                self.put_json(&client_key(&self.database, &client.client_name), client)
                    .await?;
            }
            MirrorOp::DeleteAgent { agent_id, clients } => {
                let mut doomed = Vec::with_capacity(clients.len() + 1);
                doomed.push(agent_key(&self.database, agent_id));
                doomed.extend(clients.iter().map(|c| client_key(&self.database, c)));
                self.client.del::<(), _>(doomed).await?;
            }
            MirrorOp::DeleteClient(name) => {
                self.client
                    .del::<(), _>(client_key(&self.database, name))
                    .await?;
            }
        }
        Ok(())
    }

    async fn shutdown(&self) {
        match tokio::time::timeout(self.timeout, self.client.quit()).await {
            Ok(Ok(())) => tracing::info!("Valkey connection closed"),
            Ok(Err(e)) => tracing::warn!(error = %e, "failed to close Valkey connection"),
            Err(_) => tracing::warn!(timeout = ?self.timeout, "timed out closing Valkey connection"),
        }
    }
}
