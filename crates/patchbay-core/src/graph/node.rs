//! Graph node types.
//!
//! A [`GraphNode`] bundles one plugin instance with its stable [`NodeId`] and a
//! small property bag (layout position, persisted state and anything else the
//! host wants to attach). Nodes are owned exclusively by the
//! [`GraphProcessor`](super::GraphProcessor).

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::MutexGuard;

use crate::plugin::{Plugin, PluginHandle, into_handle};
use crate::port::{Port, PortCount};

/// Unique identifier for a node in the processing graph.
///
/// IDs are allocated by the controller, start at 1, and are never reused
/// within a session. `0` is reserved as [`NodeId::INVALID`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel for "no node".
    pub const INVALID: NodeId = NodeId(0);

    /// Returns the raw numeric identifier.
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// Returns `false` for the [`INVALID`](Self::INVALID) sentinel.
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Value stored in a node's property bag.
#[derive(Clone, Debug, PartialEq)]
pub enum Property {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text (including text-encoded binary blobs).
    Text(String),
}

impl Property {
    /// Returns the value as `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Property::Int(v) => Some(*v as f64),
            Property::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `&str` if it is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Well-known property keys.
pub mod keys {
    /// Horizontal layout position.
    pub const X: &str = "x";
    /// Vertical layout position.
    pub const Y: &str = "y";
    /// Text-encoded plugin state blob.
    pub const STATE: &str = "state";
}

/// One plugin instance in the graph.
pub struct GraphNode {
    id: NodeId,
    plugin: PluginHandle,
    properties: BTreeMap<String, Property>,
}

impl GraphNode {
    /// Wraps `plugin` under `id`.
    pub(crate) fn new(id: NodeId, plugin: Box<dyn Plugin>) -> Self {
        Self {
            id,
            plugin: into_handle(plugin),
            properties: BTreeMap::new(),
        }
    }

    /// Returns the node's stable identifier.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the shared handle to the underlying plugin.
    pub fn plugin(&self) -> &PluginHandle {
        &self.plugin
    }

    /// Locks the plugin for owner-thread access.
    ///
    /// The render path never blocks on this lock; holding it for long only
    /// costs the node a silent block.
    pub fn lock_plugin(&self) -> MutexGuard<'_, Box<dyn Plugin>> {
        self.plugin.lock()
    }

    /// Returns the plugin's display name.
    pub fn name(&self) -> String {
        self.plugin.lock().name().to_owned()
    }

    /// Returns the plugin's current channel layout.
    pub fn port_count(&self) -> PortCount {
        self.plugin.lock().port_count()
    }

    /// Expands the current channel layout into ports.
    pub fn ports(&self) -> Vec<Port> {
        self.port_count().to_ports()
    }

    /// Returns a property value.
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Sets a property value, replacing any previous one.
    pub fn set_property(&mut self, key: impl Into<String>, value: Property) {
        self.properties.insert(key.into(), value);
    }

    /// Removes a property, returning its previous value.
    pub fn remove_property(&mut self, key: &str) -> Option<Property> {
        self.properties.remove(key)
    }

    /// Iterates over all properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the layout position, defaulting missing coordinates to 0.
    pub fn position(&self) -> (f64, f64) {
        let read = |key: &str| self.property(key).and_then(Property::as_f64).unwrap_or(0.0);
        (read(keys::X), read(keys::Y))
    }

    /// Records the layout position.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.set_property(keys::X, Property::Float(x));
        self.set_property(keys::Y, Property::Float(y));
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
