//! Startup rehydration and write mirroring against fake durable stores.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod support;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use agentcy_common::{AgentRecord, AgentStatus, ClientRecord};
use agentcy_registry::{AppState, DirectoryStore, MirrorOp, Snapshot, router};
use support::{HangingStore, MemoryStore, UnreachableStore, delete, get, post, put, settings};

fn persisted_alerts() -> AgentRecord {
    AgentRecord {
        agent_id: "alerts".to_string(),
        agent_url: "http://host:8001".to_string(),
        status: AgentStatus {
            alive: true,
            capabilities: BTreeSet::from(["service-alerts".to_string()]),
            ..AgentStatus::registered(None)
        },
    }
}

#[tokio::test]
async fn snapshot_is_rehydrated_at_startup() {
    let store = MemoryStore::with_snapshot(Snapshot {
        agents: vec![persisted_alerts()],
        clients: vec![ClientRecord {
            client_name: "web".to_string(),
            api_url: "http://web.api".to_string(),
            agent_id: "alerts".to_string(),
        }],
    });
    let store: Arc<dyn DirectoryStore> = store;

    let (state, _mirror) = AppState::bootstrap(Some(store), settings()).await;
    let app = router(Arc::new(state));

    let (status, found) = get(&app, "/lookup/web").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["agent_url"], "http://host:8001");

    let (_, agent) = get(&app, "/agents/alerts").await;
    assert_eq!(agent["alive"], true);
    assert_eq!(agent["capabilities"], json!(["service-alerts"]));

    let (_, stats) = get(&app, "/stats").await;
    assert_eq!(stats["valkey_enabled"], true);
    assert_eq!(stats["alive_agents"], 1);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["valkey"], true);
}

#[tokio::test]
async fn mutations_reach_the_store_in_order() {
    let store = MemoryStore::with_snapshot(Snapshot::default());
    let dyn_store: Arc<dyn DirectoryStore> = store.clone();

    let (state, mirror) = AppState::bootstrap(Some(dyn_store), settings()).await;
    let mirror = mirror.expect("persistence enabled");
    let app = router(Arc::new(state));

    post(
        &app,
        "/register",
        json!({"agent_id": "alerts", "agent_url": "http://host:8001"}),
    )
    .await;
    post(
        &app,
        "/register_client",
        json!({"client_name": "web", "api_url": "http://web.api", "agent_id": "alerts"}),
    )
    .await;
    put(&app, "/agents/alerts/status", json!({"alive": true})).await;
    delete(&app, "/agents/alerts").await;

    // Dropping the last state handle closes the queue; the mirror then drains.
    drop(app);
    tokio::time::timeout(Duration::from_secs(5), mirror)
        .await
        .expect("mirror should flush")
        .unwrap();

    assert_eq!(store.shutdowns(), 0, "a store in use stays connected");
    let ops = store.ops();
    assert_eq!(ops.len(), 4);
    assert!(matches!(&ops[0], MirrorOp::PutAgent(a) if !a.status.alive));
    assert!(matches!(&ops[1], MirrorOp::PutClient(c) if c.client_name == "web"));
    assert!(matches!(&ops[2], MirrorOp::PutAgent(a) if a.status.alive));
    assert_eq!(
        ops[3],
        MirrorOp::DeleteAgent {
            agent_id: "alerts".to_string(),
            clients: vec!["web".to_string()],
        }
    );
}

#[tokio::test]
async fn rejected_mutations_are_not_mirrored() {
    let store = MemoryStore::with_snapshot(Snapshot::default());
    let dyn_store: Arc<dyn DirectoryStore> = store.clone();

    let (state, mirror) = AppState::bootstrap(Some(dyn_store), settings()).await;
    let app = router(Arc::new(state));

    let (status, _) = post(&app, "/register", json!({"agent_id": "alerts"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = delete(&app, "/agents/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    drop(app);
    mirror.expect("persistence enabled").await.unwrap();
    assert!(store.ops().is_empty());
}

#[tokio::test]
async fn unreachable_store_falls_back_to_memory() {
    let store = Arc::new(UnreachableStore::default());
    let dyn_store: Arc<dyn DirectoryStore> = store.clone();
    let (state, mirror) = AppState::bootstrap(Some(dyn_store), settings()).await;
    assert!(mirror.is_none());
    assert_eq!(store.shutdowns(), 1, "abandoned store must be shut down");

    let app = router(Arc::new(state));
    let (status, _) = post(
        &app,
        "/register",
        json!({"agent_id": "alerts", "agent_url": "http://host:8001"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/lookup/alerts").await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = get(&app, "/stats").await;
    assert_eq!(stats["valkey_enabled"], false);
    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["valkey"], false);
}

#[tokio::test]
async fn hanging_store_load_is_bounded() {
    let store = Arc::new(HangingStore::default());
    let dyn_store: Arc<dyn DirectoryStore> = store.clone();

    let (state, mirror) = tokio::time::timeout(
        Duration::from_secs(5),
        AppState::bootstrap(Some(dyn_store), settings()),
    )
    .await
    .expect("bootstrap must give up on a hanging store");

    assert!(mirror.is_none());
    assert!(!state.persistence_enabled());
    assert_eq!(store.shutdowns(), 1);
}
