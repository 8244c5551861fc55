//! Durable-store seam and the background mirror that feeds it.
//!
//! Every mutation of the in-memory directory becomes a [`MirrorOp`] pushed
//! onto a bounded queue. A single task drains the queue and applies each op
//! to the [`DirectoryStore`] with a timeout. Submission never waits: when
//! the queue is full the op is dropped and logged. Failed or timed-out
//! writes are logged and not retried, so a restart can lose the most recent
//! writes that never reached the store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use agentcy_common::{AgentRecord, ClientRecord};

/// Every record found in the store at startup.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub agents: Vec<AgentRecord>,
    pub clients: Vec<ClientRecord>,
}

/// One write to replay against the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOp {
    PutAgent(AgentRecord),
    PutClient(ClientRecord),
    /// Agent removal together with the clients removed by the cascade.
    DeleteAgent {
        agent_id: String,
        clients: Vec<String>,
    },
    DeleteClient(String),
}

impl MirrorOp {
    fn kind(&self) -> &'static str {
        match self {
            Self::PutAgent(_) => "put_agent",
            Self::PutClient(_) => "put_client",
            Self::DeleteAgent { .. } => "delete_agent",
            Self::DeleteClient(_) => "delete_client",
        }
    }

    fn subject(&self) -> &str {
        match self {
            Self::PutAgent(agent) => &agent.agent_id,
            Self::PutClient(client) => &client.client_name,
            Self::DeleteAgent { agent_id, .. } => agent_id,
            Self::DeleteClient(name) => name,
        }
    }
}

/// External store mirroring the directory across restarts.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Check connectivity.
    async fn ping(&self) -> Result<()>;

    /// Read every persisted agent and client.
    async fn load(&self) -> Result<Snapshot>;

    /// Apply a single mirrored write.
    async fn apply(&self, op: &MirrorOp) -> Result<()>;

    /// Release the connection. Called once the store is no longer used.
    async fn shutdown(&self) {}
}

/// Producer half of the mirror queue.
#[derive(Debug, Clone)]
pub struct Mirror {
    tx: mpsc::Sender<MirrorOp>,
}

impl Mirror {
    /// Start the drain task. It exits once every `Mirror` clone is dropped
    /// and the queue is empty.
    pub fn spawn(
        store: Arc<dyn DirectoryStore>,
        capacity: usize,
        op_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(rx, store, op_timeout));
        (Self { tx }, handle)
    }

    /// Queue `op` without waiting.
    pub fn submit(&self, op: MirrorOp) {
        match self.tx.try_send(op) {
            Ok(()) => {}
            Err(TrySendError::Full(op)) => {
                tracing::warn!(
                    op = op.kind(),
                    subject = %op.subject(),
                    "mirror queue full, dropping write",
                );
            }
            Err(TrySendError::Closed(op)) => {
                tracing::warn!(
                    op = op.kind(),
                    subject = %op.subject(),
                    "mirror task stopped, dropping write",
                );
            }
        }
    }
}

async fn drain(
    mut rx: mpsc::Receiver<MirrorOp>,
    store: Arc<dyn DirectoryStore>,
    op_timeout: Duration,
) {
    while let Some(op) = rx.recv().await {
        match tokio::time::timeout(op_timeout, store.apply(&op)).await {
            Ok(Ok(())) => {
                tracing::debug!(op = op.kind(), subject = %op.subject(), "mirrored write");
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    op = op.kind(),
                    subject = %op.subject(),
                    error = %format!("{e:#}"),
                    "mirror write failed",
                );
            }
            Err(_) => {
                tracing::warn!(
                    op = op.kind(),
                    subject = %op.subject(),
                    timeout = ?op_timeout,
                    "mirror write timed out",
                );
            }
        }
    }
    tracing::info!("mirror queue closed");
}
