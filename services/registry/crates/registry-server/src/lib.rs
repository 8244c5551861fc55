//! Agentcy agent registry.
//!
//! A single-process, in-memory directory of agent endpoints and liveness
//! flags served over HTTP, optionally mirrored to Valkey so it survives
//! restarts.

pub mod config;
pub mod directory;
pub mod error;
pub mod persistence;
pub mod routes;
pub mod state;
pub mod valkey;

pub use error::RegistryError;
pub use persistence::{DirectoryStore, MirrorOp, Snapshot};
pub use routes::router;
pub use state::{AppState, MirrorSettings};
