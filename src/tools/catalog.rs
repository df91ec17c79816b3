//! Tool catalog
//!
//! Registry of the tools exposed by the configured tool servers. Every tool
//! gets a synthetic id when the catalog is built; that id, not the raw tool
//! name, is what the model sees as the function name, so two servers can
//! expose tools with the same name without colliding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;
use crate::error::{ChatError, Result};
use crate::types::Tool;

/// A tool as listed by its server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema of the arguments. Servers send either `input_schema` or
    /// `inputSchema`; a missing or null schema becomes an empty object schema.
    #[serde(
        default = "empty_object_schema",
        alias = "inputSchema",
        deserialize_with = "deserialize_schema"
    )]
    pub input_schema: serde_json::Value,
}

/// Schema for tools that take no arguments.
pub fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

fn deserialize_schema<'de, D>(deserializer: D) -> std::result::Result<serde_json::Value, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<serde_json::Value>::deserialize(deserializer)?
        .filter(|schema| !schema.is_null())
        .unwrap_or_else(empty_object_schema))
}

/// Health record of one tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    pub status: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of the catalog listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogListing {
    #[serde(default)]
    pub tools: BTreeMap<String, Vec<ToolSpec>>,
    #[serde(default)]
    pub servers_status: BTreeMap<String, ServerStatus>,
}

/// A catalog tool bound to its server and synthetic id.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: String,
    pub server: String,
    pub spec: ToolSpec,
}

impl CatalogEntry {
    /// `server/name` key used for selection.
    pub fn key(&self) -> String {
        selection_key(&self.server, &self.spec.name)
    }
}

pub fn selection_key(server: &str, tool_name: &str) -> String {
    format!("{server}/{tool_name}")
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: HashMap<String, CatalogEntry>,
    ids_by_key: BTreeMap<String, String>,
    servers_status: BTreeMap<String, ServerStatus>,
    selected: Vec<String>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a listing, assigning a fresh id to every tool.
    pub fn from_listing(listing: CatalogListing) -> Self {
        let mut catalog = Self {
            servers_status: listing.servers_status,
            ..Default::default()
        };
        for (server, specs) in listing.tools {
            for spec in specs {
                catalog.insert(server.clone(), spec);
            }
        }
        catalog
    }

    /// Register one tool and return its synthetic id.
    pub fn insert(&mut self, server: impl Into<String>, spec: ToolSpec) -> String {
        let server = server.into();
        let id = uuid::Uuid::new_v4().to_string();
        let key = selection_key(&server, &spec.name);
        if let Some(previous) = self.ids_by_key.insert(key, id.clone()) {
            self.entries.remove(&previous);
        }
        self.entries.insert(
            id.clone(),
            CatalogEntry {
                id: id.clone(),
                server,
                spec,
            },
        );
        id
    }

    /// Fetch the listing from `tools.endpoint_url`.
    pub async fn fetch(client: &reqwest::Client, tools: &ToolsConfig) -> Result<Self> {
        tracing::debug!(url = %tools.endpoint_url, "fetching tool catalog");
        let response = client.get(&tools.endpoint_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::api(
                status.as_u16(),
                format!("tool catalog request failed: {body}"),
            ));
        }
        let listing: CatalogListing = response
            .json()
            .await
            .map_err(|e| ChatError::ParseError(format!("invalid tool catalog: {e}")))?;
        let catalog = Self::from_listing(listing);
        for (server, status) in catalog.servers_status() {
            if !status.status {
                tracing::warn!(server = %server, error = ?status.error, "tool server unavailable");
            }
        }
        Ok(catalog)
    }

    /// Replace the tools with a fresh listing, keeping the selections that
    /// still exist.
    pub fn refresh(&mut self, listing: CatalogListing) {
        let selected = std::mem::take(&mut self.selected);
        *self = Self::from_listing(listing);
        self.selected = selected;
        self.retain_existing();
    }

    pub fn resolve(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    pub fn id_for(&self, server: &str, tool_name: &str) -> Option<&str> {
        self.ids_by_key
            .get(&selection_key(server, tool_name))
            .map(String::as_str)
    }

    pub fn servers_status(&self) -> &BTreeMap<String, ServerStatus> {
        &self.servers_status
    }

    /// Entries ordered by server then tool name.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.ids_by_key.values().filter_map(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select a tool by its `server/name` key. Unknown keys are kept and
    /// ignored until a listing provides them.
    pub fn select(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.selected.contains(&key) {
            self.selected.push(key);
        }
    }

    pub fn deselect(&mut self, key: &str) {
        self.selected.retain(|k| k != key);
    }

    pub fn select_all(&mut self) {
        let keys: Vec<String> = self.ids_by_key.keys().cloned().collect();
        for key in keys {
            self.select(key);
        }
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Drop selections whose tool is no longer listed.
    pub fn retain_existing(&mut self) {
        let known = &self.ids_by_key;
        self.selected.retain(|k| known.contains_key(k));
    }

    /// Function schemas of the selected tools, in selection order, named by
    /// synthetic id.
    pub fn schema(&self) -> Vec<Tool> {
        self.selected
            .iter()
            .filter_map(|key| self.ids_by_key.get(key))
            .filter_map(|id| self.entries.get(id))
            .map(|entry| {
                let parameters = if entry.spec.input_schema.is_null() {
                    empty_object_schema()
                } else {
                    entry.spec.input_schema.clone()
                };
                Tool::function(entry.id.clone(), entry.spec.description.clone(), parameters)
            })
            .collect()
    }
}
