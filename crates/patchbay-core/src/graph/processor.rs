//! Processing graph: node ownership, connection validation and publication.
//!
//! [`GraphProcessor`] owns every [`GraphNode`] and the connection list. It is
//! mutated on a single owner thread; after each structural change it compiles
//! a fresh [`RenderSchedule`] and swaps it into the shared slot read by the
//! render path. The render path never observes a partially updated topology.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::plugin::Plugin;
use crate::port::{Port, PortType};

use super::connection::Connection;
use super::node::{GraphNode, NodeId};
use super::schedule::{GraphSnapshot, RenderSchedule, RenderStep};

/// Reasons a connection request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The node is not in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    /// The port index is out of range for the node's current layout.
    #[error("port {port} not found on {node}")]
    PortNotFound {
        /// Node that was addressed.
        node: NodeId,
        /// Requested port index.
        port: u32,
    },
    /// Source is not an output, or destination is not an input.
    #[error("port {port} on {node} has the wrong direction")]
    WrongDirection {
        /// Node that was addressed.
        node: NodeId,
        /// Requested port index.
        port: u32,
    },
    /// Source and destination ports carry different channel kinds.
    #[error("cannot connect {from} output to {to} input")]
    TypeMismatch {
        /// Port type of the source port.
        from: PortType,
        /// Port type of the destination port.
        to: PortType,
    },
    /// The exact connection already exists.
    #[error("connection {0} already exists")]
    DuplicateConnection(Connection),
    /// Adding this connection would create a cycle.
    #[error("connection {0} would create a cycle")]
    CycleDetected(Connection),
}

/// Which rules a connection must pass.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Rules {
    /// Every rule, used for user-initiated connections.
    Full,
    /// Structural invariants only; direction and port type are trusted.
    Structural,
}

/// Real-time execution graph.
///
/// # Usage
///
/// 1. Create with [`new()`](Self::new)
/// 2. Register plugin instances: [`add_node()`](Self::add_node) under IDs
///    allocated by the caller
/// 3. Connect ports: [`add_connection()`](Self::add_connection)
/// 4. Hand [`snapshot()`](Self::snapshot) to a
///    [`GraphRenderer`](super::GraphRenderer) on the render thread
///
/// Every mutation that changes the topology republishes the render schedule
/// before returning.
pub struct GraphProcessor {
    nodes: Vec<GraphNode>,
    /// Node ID → position in `nodes`.
    index: HashMap<NodeId, usize>,
    connections: Vec<Connection>,
    shared: Arc<ArcSwap<RenderSchedule>>,
    /// Schedules replaced by a newer one, kept until the render path lets go
    /// so their plugins are never dropped on the render thread.
    retired: Vec<Arc<RenderSchedule>>,
    sample_rate: f32,
    block_size: usize,
    revision: u64,
}

impl GraphProcessor {
    /// Creates an empty graph.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz passed to every plugin's `prepare`
    /// * `block_size` - Maximum frames per render block
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            connections: Vec::new(),
            shared: Arc::new(ArcSwap::from_pointee(RenderSchedule::empty())),
            retired: Vec::new(),
            sample_rate,
            block_size,
            revision: 0,
        }
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Returns the maximum block size.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Re-prepares every plugin for a new sample rate or block size.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        for node in &self.nodes {
            node.lock_plugin().prepare(sample_rate, block_size);
        }
        tracing::debug!(sample_rate, block_size, "graph_prepare");
    }

    // --- Nodes ---

    /// Wraps `plugin` in a new node registered under `id`.
    ///
    /// The plugin is prepared before the node is published to the render
    /// path. The processor never allocates IDs itself.
    ///
    /// # Panics
    ///
    /// Panics if `id` is [`NodeId::INVALID`] or already present. Both are
    /// caller bugs, not recoverable conditions.
    pub fn add_node(&mut self, mut plugin: Box<dyn Plugin>, id: NodeId) -> &GraphNode {
        assert!(id.is_valid(), "add_node: invalid node id");
        assert!(
            !self.index.contains_key(&id),
            "add_node: duplicate node id {id}"
        );

        plugin.prepare(self.sample_rate, self.block_size);
        let pos = self.nodes.len();
        self.nodes.push(GraphNode::new(id, plugin));
        self.index.insert(id, pos);
        tracing::debug!("graph_add: node {id}");

        self.publish();
        &self.nodes[pos]
    }

    /// Removes a node and every connection touching it.
    ///
    /// Returns `false` (and does nothing) if the node is not present.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(pos) = self.index.remove(&id) else {
            return false;
        };

        self.connections.retain(|c| !c.touches(id));
        self.nodes.remove(pos);
        for (i, node) in self.nodes.iter().enumerate().skip(pos) {
            self.index.insert(node.id(), i);
        }
        tracing::debug!("graph_remove: node {id}");

        self.publish();
        true
    }

    /// Returns the number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node at `index` in insertion order.
    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    /// Returns the node with `id`.
    pub fn node_for_id(&self, id: NodeId) -> Option<&GraphNode> {
        self.index.get(&id).map(|&pos| &self.nodes[pos])
    }

    /// Returns the node with `id` for property writes.
    pub fn node_for_id_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        let pos = *self.index.get(&id)?;
        self.nodes.get_mut(pos)
    }

    /// Returns `true` if a node with `id` is present.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    // --- Connections ---

    /// Returns the number of connections.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// Returns the connection at `index`.
    pub fn connection(&self, index: usize) -> Option<&Connection> {
        self.connections.get(index)
    }

    /// Returns all connections in insertion order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Finds the exact connection tuple.
    pub fn connection_between(
        &self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> Option<&Connection> {
        let wanted = Connection::new(source_node, source_port, dest_node, dest_port);
        self.connections.iter().find(|c| **c == wanted)
    }

    /// Returns `true` if the connection would be accepted by
    /// [`add_connection()`](Self::add_connection).
    pub fn can_connect(
        &self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        let c = Connection::new(source_node, source_port, dest_node, dest_port);
        self.check(&c, Rules::Full).is_ok()
    }

    /// Validates a connection, returning the first rule it breaks.
    pub fn check_connection(&self, connection: &Connection) -> Result<(), GraphError> {
        self.check(connection, Rules::Full)
    }

    /// Adds a connection, reporting why it was rejected.
    ///
    /// Nothing changes on error.
    pub fn connect(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> Result<(), GraphError> {
        let c = Connection::new(source_node, source_port, dest_node, dest_port);
        self.check(&c, Rules::Full)?;
        self.insert_connection(c);
        Ok(())
    }

    /// Adds a connection if every rule passes.
    ///
    /// Returns `false` with no change otherwise.
    pub fn add_connection(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        match self.connect(source_node, source_port, dest_node, dest_port) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("graph_connect rejected: {e}");
                false
            }
        }
    }

    /// Re-applies a stored connection during a full graph load.
    ///
    /// The tuple was valid when saved, so direction and port type are
    /// trusted. Node presence, port range, uniqueness and acyclicity are
    /// still enforced because the render path depends on them.
    pub fn restore_connection(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        let c = Connection::new(source_node, source_port, dest_node, dest_port);
        match self.check(&c, Rules::Structural) {
            Ok(()) => {
                self.insert_connection(c);
                true
            }
            Err(e) => {
                tracing::warn!("graph_restore: dropping {c}: {e}");
                false
            }
        }
    }

    /// Removes the connection at `index`.
    pub fn remove_connection(&mut self, index: usize) -> bool {
        if index >= self.connections.len() {
            return false;
        }
        let c = self.connections.remove(index);
        tracing::debug!("graph_disconnect: {c}");
        self.publish();
        true
    }

    /// Removes the exact connection tuple if present.
    pub fn remove_connection_between(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        let wanted = Connection::new(source_node, source_port, dest_node, dest_port);
        match self.connections.iter().position(|c| *c == wanted) {
            Some(index) => self.remove_connection(index),
            None => false,
        }
    }

    /// Removes every connection touching `id`, keeping the node.
    ///
    /// Returns whether anything was removed.
    pub fn disconnect_node(&mut self, id: NodeId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(id));
        let changed = self.connections.len() != before;
        if changed {
            tracing::debug!("graph_disconnect: node {id}");
            self.publish();
        }
        changed
    }

    /// Returns `true` if the connection's endpoints exist and its ports are
    /// still valid (range, direction, type) for the current layouts.
    pub fn is_connection_legal(&self, connection: &Connection) -> bool {
        self.check_ports(connection, Rules::Full).is_ok()
    }

    /// Prunes connections invalidated by a channel layout change.
    ///
    /// The render schedule is recompiled whenever a connection is pruned or
    /// any node's audio layout differs from the published one, so the render
    /// path always hands each plugin one buffer per declared audio port.
    ///
    /// Returns whether any connections were removed.
    pub fn remove_illegal_connections(&mut self) -> bool {
        let before = self.connections.len();
        let legal: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| self.is_connection_legal(c))
            .copied()
            .collect();
        self.connections = legal;

        let changed = self.connections.len() != before;
        if changed {
            tracing::debug!(
                "graph_prune: removed {} illegal connections",
                before - self.connections.len()
            );
            self.publish();
        } else {
            self.refresh_layouts();
        }
        changed
    }

    /// Recompiles the render schedule if any node's audio layout changed
    /// since it was published.
    ///
    /// Returns whether a new schedule was published.
    pub fn refresh_layouts(&mut self) -> bool {
        if !self.layouts_stale() {
            return false;
        }
        tracing::debug!("graph_refresh: audio layout changed");
        self.publish();
        true
    }

    /// Removes every node and connection.
    pub fn clear(&mut self) {
        self.connections.clear();
        self.index.clear();
        self.nodes.clear();
        tracing::debug!("graph_clear");
        self.publish();
    }

    // --- Execution ---

    /// Returns a deterministic topological order of all nodes.
    ///
    /// Kahn's algorithm; ties are broken by ascending node ID, so the same
    /// topology always yields the same order.
    pub fn execution_order(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.nodes.iter().map(|n| (n.id(), 0)).collect();
        for c in &self.connections {
            if let Some(d) = in_degree.get_mut(&c.dest_node) {
                *d += 1;
            }
        }

        let mut ready: BTreeSet<NodeId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id);
            for c in self.connections.iter().filter(|c| c.source_node == id) {
                if let Some(d) = in_degree.get_mut(&c.dest_node) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(c.dest_node);
                    }
                }
            }
        }

        // Unreachable while connections are validated on insertion.
        debug_assert_eq!(order.len(), self.nodes.len(), "cycle in processing graph");
        if order.len() != self.nodes.len() {
            tracing::error!("graph_sort: cycle detected, appending remaining nodes");
            let placed: HashSet<NodeId> = order.iter().copied().collect();
            let mut rest: Vec<NodeId> = self
                .nodes
                .iter()
                .map(|n| n.id())
                .filter(|id| !placed.contains(id))
                .collect();
            rest.sort_unstable();
            order.extend(rest);
        }

        order
    }

    /// Returns a reader for the published render schedule.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the currently published schedule.
    pub fn schedule(&self) -> Arc<RenderSchedule> {
        self.shared.load_full()
    }

    /// Returns the number of topology changes published so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // --- Internal helpers ---

    fn insert_connection(&mut self, c: Connection) {
        self.connections.push(c);
        tracing::debug!("graph_connect: {c}");
        self.publish();
    }

    fn port(&self, id: NodeId, index: u32) -> Result<Port, GraphError> {
        let node = self
            .node_for_id(id)
            .ok_or(GraphError::NodeNotFound(id))?;
        node.ports()
            .into_iter()
            .nth(index as usize)
            .ok_or(GraphError::PortNotFound {
                node: id,
                port: index,
            })
    }

    fn check_ports(&self, c: &Connection, rules: Rules) -> Result<(), GraphError> {
        let src = self.port(c.source_node, c.source_port)?;
        let dst = self.port(c.dest_node, c.dest_port)?;

        if rules == Rules::Full {
            if !src.is_output() {
                return Err(GraphError::WrongDirection {
                    node: c.source_node,
                    port: c.source_port,
                });
            }
            if !dst.is_input {
                return Err(GraphError::WrongDirection {
                    node: c.dest_node,
                    port: c.dest_port,
                });
            }
            if src.port_type != dst.port_type {
                return Err(GraphError::TypeMismatch {
                    from: src.port_type,
                    to: dst.port_type,
                });
            }
        }
        Ok(())
    }

    fn check(&self, c: &Connection, rules: Rules) -> Result<(), GraphError> {
        self.check_ports(c, rules)?;

        if self.connections.contains(c) {
            return Err(GraphError::DuplicateConnection(*c));
        }

        // A cycle exists if the destination can already reach the source.
        // Self-connections count as cycles.
        if self.can_reach(c.dest_node, c.source_node) {
            return Err(GraphError::CycleDetected(*c));
        }

        Ok(())
    }

    /// DFS reachability: can `from` reach `to` via existing connections?
    fn can_reach(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.extend(
                self.connections
                    .iter()
                    .filter(|c| c.source_node == current)
                    .map(|c| c.dest_node),
            );
        }
        false
    }

    /// Compiles the current topology into a render schedule.
    fn compile(&self) -> RenderSchedule {
        let order = self.execution_order();

        // (node, audio output channel) → buffer slot
        let mut slots: HashMap<(NodeId, u32), usize> = HashMap::new();
        let mut steps = Vec::with_capacity(order.len());
        let mut buffer_count = 0usize;
        let mut max_inputs = 0usize;

        for id in order {
            let Some(node) = self.node_for_id(id) else {
                continue;
            };
            let count = node.port_count();
            let audio_inputs = count.get(PortType::Audio, true) as usize;
            let audio_outputs = count.get(PortType::Audio, false) as usize;
            let ports = count.to_ports();

            let output_base = buffer_count;
            for ch in 0..audio_outputs {
                slots.insert((id, ch as u32), output_base + ch);
            }
            buffer_count += audio_outputs;

            let mut inputs = vec![Vec::new(); audio_inputs];
            for c in self.connections.iter().filter(|c| c.dest_node == id) {
                let Some(dst) = ports.get(c.dest_port as usize) else {
                    continue;
                };
                if dst.port_type != PortType::Audio || !dst.is_input {
                    continue;
                }
                let Some(src) = self
                    .node_for_id(c.source_node)
                    .and_then(|n| n.ports().into_iter().nth(c.source_port as usize))
                else {
                    continue;
                };
                if src.port_type != PortType::Audio || src.is_input {
                    continue;
                }
                if let Some(&slot) = slots.get(&(c.source_node, src.channel)) {
                    inputs[dst.channel as usize].push(slot);
                }
            }

            max_inputs = max_inputs.max(audio_inputs);
            steps.push(RenderStep {
                node: id,
                plugin: Arc::clone(node.plugin()),
                output_base,
                audio_outputs,
                inputs,
            });
        }

        RenderSchedule {
            steps,
            buffer_count,
            max_inputs,
            revision: self.revision,
        }
    }

    /// Returns `true` if the published schedule's audio channel counts no
    /// longer match the nodes' live layouts.
    fn layouts_stale(&self) -> bool {
        let schedule = self.shared.load();
        if schedule.step_count() != self.nodes.len() {
            return true;
        }
        self.nodes.iter().any(|node| {
            let count = node.port_count();
            schedule.step_for(node.id()).is_none_or(|step| {
                step.audio_inputs() != count.get(PortType::Audio, true) as usize
                    || step.audio_outputs() != count.get(PortType::Audio, false) as usize
            })
        })
    }

    /// Compiles and atomically swaps in a new schedule.
    fn publish(&mut self) {
        self.revision += 1;
        let schedule = Arc::new(self.compile());
        tracing::debug!(
            "graph_publish: rev {} ({} steps, {} buffers)",
            self.revision,
            schedule.step_count(),
            schedule.buffer_count()
        );
        let previous = self.shared.swap(schedule);
        self.retired.push(previous);
        self.collect_garbage();
    }

    /// Drops retired schedules the render path no longer references.
    fn collect_garbage(&mut self) {
        self.retired.retain(|s| Arc::strong_count(s) > 1);
    }
}
