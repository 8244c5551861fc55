//! Request and response schemas for the registry HTTP API.
//!
//! Request bodies are deserialized leniently (every field optional) and then
//! validated into strict registration values before any state is touched,
//! so a missing field surfaces as a [`ValidationError`] rather than a serde
//! failure.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Rejection of a request at the API boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ValidationError::MissingField(field)),
    }
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ===================================================================
// Requests
// ===================================================================

/// Body of `POST /register`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterAgentRequest {
    pub agent_id: Option<String>,
    pub agent_url: Option<String>,
    pub api_url: Option<String>,
}

/// A validated agent registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentRegistration {
    pub agent_id: String,
    pub agent_url: String,
    pub api_url: Option<String>,
}

impl RegisterAgentRequest {
    pub fn validate(self) -> Result<AgentRegistration, ValidationError> {
        Ok(AgentRegistration {
            agent_id: required(self.agent_id, "agent_id")?,
            agent_url: required(self.agent_url, "agent_url")?,
            api_url: optional(self.api_url),
        })
    }
}

/// Body of `POST /register_client`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterClientRequest {
    pub client_name: Option<String>,
    pub api_url: Option<String>,
    pub agent_id: Option<String>,
}

/// A validated client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub client_name: String,
    pub api_url: String,
    pub agent_id: String,
}

impl RegisterClientRequest {
    pub fn validate(self) -> Result<ClientRegistration, ValidationError> {
        Ok(ClientRegistration {
            client_name: required(self.client_name, "client_name")?,
            api_url: required(self.api_url, "api_url")?,
            agent_id: required(self.agent_id, "agent_id")?,
        })
    }
}

/// Body of `PUT /agents/{agent_id}/status`.
///
/// Absent fields are left untouched. `assigned_to` distinguishes an absent
/// field (`None`) from an explicit `null` (`Some(None)`), which clears the
/// assignment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    #[serde(default)]
    pub alive: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub assigned_to: Option<Option<String>>,
    #[serde(default)]
    pub capabilities: Option<BTreeSet<String>>,
    #[serde(default)]
    pub tags: Option<BTreeSet<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query string of `GET /search`. List filters are comma-separated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub capabilities: Option<String>,
    pub tags: Option<String>,
}

/// Parsed search filters. Empty sets and an absent `text` match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: Option<String>,
    pub capabilities: BTreeSet<String>,
    pub tags: BTreeSet<String>,
}

fn split_list(raw: Option<&str>) -> BTreeSet<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl SearchParams {
    #[must_use]
    pub fn into_query(self) -> SearchQuery {
        SearchQuery {
            text: optional(self.q),
            capabilities: split_list(self.capabilities.as_deref()),
            tags: split_list(self.tags.as_deref()),
        }
    }
}

// ===================================================================
// Responses
// ===================================================================

/// Generic confirmation returned by the registration endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Confirmation {
    pub status: String,
    pub message: String,
}

impl Confirmation {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }
}

/// Result of `GET /lookup/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LookupResponse {
    pub agent_id: String,
    pub agent_url: String,
    pub api_url: Option<String>,
}

/// Result of `DELETE /agents/{agent_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentDeleted {
    pub status: String,
    pub agent_id: String,
    /// Clients that were mapped to the agent and removed with it.
    pub removed_clients: Vec<String>,
}

/// Result of `DELETE /clients/{client_name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientDeleted {
    pub status: String,
    pub client_name: String,
}

/// Result of `GET /stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub total_agents: usize,
    pub alive_agents: usize,
    pub total_clients: usize,
    pub valkey_enabled: bool,
}

/// Result of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    /// Whether the durable store answered a ping just now.
    pub valkey: bool,
    pub timestamp: DateTime<Utc>,
}
