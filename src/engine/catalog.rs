//! Agent/provider catalog consulted for routing decisions.
//!
//! The catalog is static configuration loaded at startup, not a live
//! registry. The aggregating executor rejects graph ids it does not list.

use serde::{Deserialize, Serialize};

use crate::engine::port::GraphId;

/// One routable agent entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentEntry {
    pub agent_id: String,
    /// Namespaced as `{provider_id}:{graph_name}`.
    pub graph_id: String,
    pub name: String,
    pub description: String,
}

impl AgentEntry {
    pub fn new(
        agent_id: impl Into<String>,
        graph_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            graph_id: graph_id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Read-only agent listing.
#[derive(Clone, Debug, Default)]
pub struct AgentCatalog {
    entries: Vec<AgentEntry>,
}

impl AgentCatalog {
    pub fn from_entries(entries: Vec<AgentEntry>) -> Self {
        Self { entries }
    }

    /// Load from a JSON array, e.g. a deployment config file.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<AgentEntry> = serde_json::from_str(json)?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[AgentEntry] {
        &self.entries
    }

    pub fn contains(&self, graph_id: &GraphId) -> bool {
        let wanted = graph_id.to_string();
        self.entries.iter().any(|entry| entry.graph_id == wanted)
    }

    pub fn find(&self, agent_id: &str) -> Option<&AgentEntry> {
        self.entries.iter().find(|entry| entry.agent_id == agent_id)
    }
}
