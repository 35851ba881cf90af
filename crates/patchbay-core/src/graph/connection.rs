//! Graph connection (arc) type.
//!
//! A [`Connection`] joins one node's output port to another node's input port.
//! Connections are created and destroyed through the processor; they are
//! never edited in place.

use std::fmt;

use super::node::NodeId;

/// A directed edge from a source output port to a destination input port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Node producing the signal.
    pub source_node: NodeId,
    /// Global port index on the source node.
    pub source_port: u32,
    /// Node consuming the signal.
    pub dest_node: NodeId,
    /// Global port index on the destination node.
    pub dest_port: u32,
}

impl Connection {
    /// Creates a connection tuple.
    pub fn new(source_node: NodeId, source_port: u32, dest_node: NodeId, dest_port: u32) -> Self {
        Self {
            source_node,
            source_port,
            dest_node,
            dest_port,
        }
    }

    /// Returns `true` if either endpoint is `id`.
    #[inline]
    pub fn touches(&self, id: NodeId) -> bool {
        self.source_node == id || self.dest_node == id
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} → {}:{}",
            self.source_node.0, self.source_port, self.dest_node.0, self.dest_port
        )
    }
}
