//! Shared fixtures for the registry integration tests.
//!
//! In-memory [`DirectoryStore`] fakes plus a helper that drives the axum
//! router in-process.

#![allow(dead_code, clippy::expect_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use agentcy_registry::{DirectoryStore, MirrorOp, MirrorSettings, Snapshot};

pub fn settings() -> MirrorSettings {
    MirrorSettings {
        queue_capacity: 64,
        timeout: Duration::from_millis(200),
    }
}

// ── Request helper ───────────────────────────────────────────────────────────

/// Send one request through `app` and decode the JSON reply
/// (`Value::Null` for an empty body).
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize body"))
        }
        None => Body::empty(),
    };
    let request = builder.body(body).expect("build request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is JSON")
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::DELETE, uri, None).await
}

// ── Store: in-memory, records every op ───────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub snapshot: Snapshot,
    pub ops: Mutex<Vec<MirrorOp>>,
    shutdowns: AtomicUsize,
}

impl MemoryStore {
    pub fn with_snapshot(snapshot: Snapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot,
            ..Self::default()
        })
    }

    pub fn ops(&self) -> Vec<MirrorOp> {
        self.ops.lock().expect("ops lock").clone()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.clone())
    }
    async fn apply(&self, op: &MirrorOp) -> Result<()> {
        self.ops.lock().expect("ops lock").push(op.clone());
        Ok(())
    }
    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Store: unreachable ───────────────────────────────────────────────────────

/// Connected but every command fails. Counts `shutdown` calls.
#[derive(Default)]
pub struct UnreachableStore {
    shutdowns: AtomicUsize,
}

impl UnreachableStore {
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for UnreachableStore {
    async fn ping(&self) -> Result<()> {
        anyhow::bail!("connection refused")
    }
    async fn load(&self) -> Result<Snapshot> {
        anyhow::bail!("connection refused")
    }
    async fn apply(&self, _: &MirrorOp) -> Result<()> {
        anyhow::bail!("connection refused")
    }
    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Store: hangs forever ─────────────────────────────────────────────────────

/// Never answers a command. Counts `shutdown` calls.
#[derive(Default)]
pub struct HangingStore {
    shutdowns: AtomicUsize,
}

impl HangingStore {
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryStore for HangingStore {
    async fn ping(&self) -> Result<()> {
        std::future::pending().await
    }
    async fn load(&self) -> Result<Snapshot> {
        std::future::pending().await
    }
    async fn apply(&self, _: &MirrorOp) -> Result<()> {
        std::future::pending().await
    }
    async fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}
