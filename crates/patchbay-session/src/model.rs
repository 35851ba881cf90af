//! Persisted graph model: the serializable mirror of the live graph.
//!
//! A [`GraphModel`] holds identifiers and duplicated property values only.
//! It never owns live plugin objects, so it can be cloned, serialized and
//! dropped independently of the running graph. Nodes are joined to the
//! live [`GraphNode`](patchbay_core::GraphNode)s purely by ID.

use std::path::Path;

use patchbay_core::{Connection, NodeId};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Reference used to re-instantiate a plugin on load.
///
/// The fields are opaque to the graph; only the plugin factory interprets
/// them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginDescription {
    /// Display name of the plugin.
    pub name: String,

    /// Plugin format understood by a factory (e.g. `"builtin"`).
    pub format: String,

    /// Format-specific unique identifier.
    pub identifier: String,

    /// Optional vendor name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Optional version string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl PluginDescription {
    /// Create a description with the required fields.
    pub fn new(
        name: impl Into<String>,
        format: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
            identifier: identifier.into(),
            manufacturer: None,
            version: None,
        }
    }

    /// Set the manufacturer.
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Checks that the description can be handed to a factory.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.format.trim().is_empty() {
            return Err(SessionError::InvalidDescription(format!(
                "'{}' has no plugin format",
                self.name
            )));
        }
        if self.identifier.trim().is_empty() {
            return Err(SessionError::InvalidDescription(format!(
                "'{}' has no plugin identifier",
                self.name
            )));
        }
        Ok(())
    }
}

/// One node of the persisted graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeEntry {
    /// Node ID, shared with the live graph.
    pub id: u32,

    /// Display name at the time the node was created.
    #[serde(default)]
    pub name: String,

    /// Horizontal layout position.
    #[serde(default)]
    pub x: f64,

    /// Vertical layout position.
    #[serde(default)]
    pub y: f64,

    /// Base64-encoded plugin state, if the plugin had any to save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// How to re-create the plugin.
    pub plugin: PluginDescription,
}

impl NodeEntry {
    /// Returns the entry's ID as a [`NodeId`].
    pub fn node_id(&self) -> NodeId {
        NodeId(self.id)
    }
}

/// One connection of the persisted graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ArcEntry {
    /// Source node ID.
    pub source_node: u32,
    /// Source port index.
    pub source_port: u32,
    /// Destination node ID.
    pub dest_node: u32,
    /// Destination port index.
    pub dest_port: u32,
}

impl ArcEntry {
    /// Converts the entry into a live connection tuple.
    pub fn connection(&self) -> Connection {
        Connection::new(
            NodeId(self.source_node),
            self.source_port,
            NodeId(self.dest_node),
            self.dest_port,
        )
    }
}

impl From<&Connection> for ArcEntry {
    fn from(c: &Connection) -> Self {
        Self {
            source_node: c.source_node.get(),
            source_port: c.source_port,
            dest_node: c.dest_node.get(),
            dest_port: c.dest_port,
        }
    }
}

/// Serializable graph document with a `nodes` and an `arcs` collection.
///
/// # TOML Format
///
/// ```toml
/// name = "Vocal Chain"
///
/// [[nodes]]
/// id = 1
/// name = "Gain"
/// x = 120.0
/// y = 40.0
/// state = "AAAAQA=="
///
/// [nodes.plugin]
/// name = "Gain"
/// format = "builtin"
/// identifier = "gain"
///
/// [[arcs]]
/// sourceNode = 1
/// sourcePort = 2
/// destNode = 2
/// destPort = 0
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphModel {
    /// Name of the graph.
    #[serde(default = "default_name")]
    pub name: String,

    /// Node entries in insertion order.
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,

    /// Connection entries in the live graph's order.
    #[serde(default)]
    pub arcs: Vec<ArcEntry>,
}

fn default_name() -> String {
    "Untitled".to_string()
}

impl GraphModel {
    /// Create an empty graph document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            arcs: Vec::new(),
        }
    }

    /// Finds the entry for `id`.
    pub fn node(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.iter().find(|n| n.id == id.get())
    }

    /// Finds the entry for `id` for editing.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeEntry> {
        self.nodes.iter_mut().find(|n| n.id == id.get())
    }

    /// Returns the highest node ID in the document, or 0 when empty.
    pub fn max_node_id(&self) -> u32 {
        self.nodes.iter().map(|n| n.id).max().unwrap_or(0)
    }

    /// Returns `true` if the document has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Load a graph from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| SessionError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Save the graph to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| SessionError::write_file(path, e))?;
        Ok(())
    }

    /// Parse a graph from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, SessionError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Convert the graph to a TOML string.
    pub fn to_toml(&self) -> Result<String, SessionError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Parse a graph from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Convert the graph to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new(default_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain_entry(id: u32) -> NodeEntry {
        NodeEntry {
            id,
            name: "Gain".to_string(),
            x: 10.0,
            y: 20.0,
            state: None,
            plugin: PluginDescription::new("Gain", "builtin", "gain"),
        }
    }

    #[test]
    fn test_description_validation() {
        assert!(PluginDescription::new("Gain", "builtin", "gain").validate().is_ok());
        assert!(matches!(
            PluginDescription::new("Gain", "", "gain").validate(),
            Err(SessionError::InvalidDescription(_))
        ));
        assert!(matches!(
            PluginDescription::new("Gain", "builtin", "  ").validate(),
            Err(SessionError::InvalidDescription(_))
        ));
    }

    #[test]
    fn test_arc_keys_are_camel_case() {
        let arc = ArcEntry {
            source_node: 1,
            source_port: 2,
            dest_node: 3,
            dest_port: 0,
        };
        let json = serde_json::to_string(&arc).unwrap();
        assert_eq!(
            json,
            r#"{"sourceNode":1,"sourcePort":2,"destNode":3,"destPort":0}"#
        );
        assert_eq!(arc.connection(), Connection::new(NodeId(1), 2, NodeId(3), 0));
        assert_eq!(ArcEntry::from(&arc.connection()), arc);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut model = GraphModel::new("Chain");
        let mut entry = gain_entry(1);
        entry.state = Some("AAAAQA==".to_string());
        entry.plugin = entry.plugin.with_manufacturer("Patchbay");
        model.nodes.push(entry);
        model.nodes.push(gain_entry(2));
        model.arcs.push(ArcEntry {
            source_node: 1,
            source_port: 2,
            dest_node: 2,
            dest_port: 0,
        });

        let toml_str = model.to_toml().unwrap();
        assert!(toml_str.contains("sourceNode = 1"));
        assert!(toml_str.contains("[nodes.plugin]"));

        let parsed = GraphModel::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, model);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[[nodes]]
id = 4
x = 3

[nodes.plugin]
name = "Tone"
format = "builtin"
identifier = "tone"
"#;
        let model = GraphModel::from_toml(toml_str).unwrap();
        assert_eq!(model.name, "Untitled");
        assert_eq!(model.nodes.len(), 1);
        assert!(model.arcs.is_empty());

        let node = model.node(NodeId(4)).unwrap();
        assert_eq!(node.x, 3.0);
        assert_eq!(node.y, 0.0);
        assert!(node.state.is_none());
        assert!(node.plugin.version.is_none());
        assert_eq!(model.max_node_id(), 4);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut model = GraphModel::new("Json");
        model.nodes.push(gain_entry(9));
        let json = model.to_json().unwrap();
        assert!(json.contains("\"identifier\": \"gain\""));
        assert_eq!(GraphModel::from_json(&json).unwrap(), model);
    }

    #[test]
    fn test_empty_graph_keeps_both_collections() {
        let model = GraphModel::new("Empty");

        let toml_str = model.to_toml().unwrap();
        assert!(toml_str.contains("nodes = []"), "{toml_str}");
        assert!(toml_str.contains("arcs = []"), "{toml_str}");
        assert_eq!(GraphModel::from_toml(&toml_str).unwrap(), model);

        let json: serde_json::Value = serde_json::from_str(&model.to_json().unwrap()).unwrap();
        assert_eq!(json["nodes"], serde_json::json!([]));
        assert_eq!(json["arcs"], serde_json::json!([]));
    }

    #[test]
    fn test_invalid_toml() {
        let result = GraphModel::from_toml("this is not [valid toml");
        assert!(matches!(result, Err(SessionError::TomlParse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.toml");

        let mut model = GraphModel::new("Saved");
        model.nodes.push(gain_entry(1));
        model.save(&path).unwrap();

        let loaded = GraphModel::load(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraphModel::load("/nonexistent/graph.toml");
        assert!(matches!(result, Err(SessionError::ReadFile { .. })));
    }

    #[test]
    fn test_node_lookup() {
        let mut model = GraphModel::default();
        model.nodes.push(gain_entry(3));
        assert!(model.node(NodeId(3)).is_some());
        assert!(model.node(NodeId(4)).is_none());

        model.node_mut(NodeId(3)).unwrap().x = 99.0;
        assert_eq!(model.node(NodeId(3)).unwrap().x, 99.0);
        assert!(!model.is_empty());
    }
}
