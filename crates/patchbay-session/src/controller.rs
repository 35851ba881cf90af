//! Control-plane orchestrator keeping the persisted model and the live graph
//! in lockstep.
//!
//! [`GraphController`] is the only thing that edits a session. Every
//! operation goes to the [`GraphProcessor`] first; on success the
//! [`GraphModel`] is updated to match and a [`GraphEvent`] is published.
//! After each mutating call the model holds exactly one entry per live node
//! and one per live connection.
//!
//! The controller is single-threaded: call it from one owner thread. The
//! render thread reads the processor's published schedule through
//! [`GraphController::snapshot`] and is never blocked by the controller.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crossbeam_channel::Receiver;
use patchbay_core::{
    Connection, GraphError, GraphNode, GraphProcessor, GraphSnapshot, NodeId, Property, keys,
};

use crate::error::SessionError;
use crate::factory::PluginFactory;
use crate::model::{ArcEntry, GraphModel, NodeEntry, PluginDescription};
use crate::notify::{Broadcaster, GraphEvent, LogNotifier, Notifier};

/// Outcome of [`GraphController::set_node_model`].
///
/// A load never fails as a whole; entries that could not be restored are
/// listed here instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Nodes whose plugin could not be instantiated (pruned from the model).
    pub pruned: Vec<NodeId>,
    /// Stored connections the live graph refused.
    pub dropped_arcs: Vec<ArcEntry>,
    /// Nodes that loaded with default state because their stored state was
    /// unreadable or rejected.
    pub bad_state: Vec<NodeId>,
}

impl LoadReport {
    /// Returns `true` if everything in the document was restored.
    pub fn is_clean(&self) -> bool {
        self.pruned.is_empty() && self.dropped_arcs.is_empty() && self.bad_state.is_empty()
    }
}

/// Owns a live graph and its persisted model.
///
/// # Example
///
/// ```rust,ignore
/// let mut controller = GraphController::new(GraphProcessor::new(48000.0, 256), registry);
/// let events = controller.subscribe();
///
/// let gain = controller.add_filter(&description, 100.0, 50.0, NodeId::INVALID);
/// assert!(gain.is_valid());
/// assert!(events.try_recv().is_ok());
///
/// controller.save_plugin_states();
/// controller.model().save("session.toml")?;
/// ```
pub struct GraphController {
    processor: GraphProcessor,
    factory: Box<dyn PluginFactory>,
    notifier: Box<dyn Notifier>,
    model: GraphModel,
    /// Last allocated node ID. Never decreases.
    last_uid: u32,
    events: Broadcaster,
}

impl GraphController {
    /// Creates a controller around `processor`, instantiating plugins with
    /// `factory`. Errors are reported through [`LogNotifier`].
    ///
    /// The controller starts from an empty session; anything already in
    /// `processor` is cleared.
    pub fn new(mut processor: GraphProcessor, factory: impl PluginFactory + 'static) -> Self {
        if processor.num_nodes() > 0 {
            processor.clear();
        }
        Self {
            processor,
            factory: Box::new(factory),
            notifier: Box::new(LogNotifier),
            model: GraphModel::default(),
            last_uid: 0,
            events: Broadcaster::default(),
        }
    }

    /// Replaces the notifier used for user-facing errors.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Subscribes to change events.
    pub fn subscribe(&mut self) -> Receiver<GraphEvent> {
        self.events.subscribe()
    }

    /// Returns the number of change events published so far.
    pub fn change_count(&self) -> u64 {
        self.events.revision()
    }

    /// Returns the persisted model.
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Returns the live graph.
    pub fn processor(&self) -> &GraphProcessor {
        &self.processor
    }

    /// Returns a reader for the render thread.
    pub fn snapshot(&self) -> GraphSnapshot {
        self.processor.snapshot()
    }

    // --- IDs ---

    /// Allocates a fresh node ID.
    ///
    /// IDs strictly increase and are never reused for the controller's
    /// lifetime, including across [`clear`](Self::clear) and loads.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::IdsExhausted`] once `u32::MAX` has been
    /// handed out. The counter is left unchanged.
    pub fn next_uid(&mut self) -> Result<NodeId, SessionError> {
        self.last_uid = self
            .last_uid
            .checked_add(1)
            .ok_or(SessionError::IdsExhausted)?;
        Ok(NodeId(self.last_uid))
    }

    // --- Nodes ---

    /// Returns the number of nodes.
    pub fn num_filters(&self) -> usize {
        self.processor.num_nodes()
    }

    /// Returns the node at `index` in insertion order.
    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.processor.node(index)
    }

    /// Returns the node with `id`.
    pub fn node_for_id(&self, id: NodeId) -> Option<&GraphNode> {
        self.processor.node_for_id(id)
    }

    /// Instantiates `description` and registers it under `id`.
    ///
    /// Passing [`NodeId::INVALID`] allocates the next ID. The position is
    /// written to the node's properties. The persisted model is not touched
    /// and no event is published; use [`add_filter`](Self::add_filter) for
    /// a complete edit.
    ///
    /// Returns `None` (with nothing changed) if the description is malformed,
    /// the ID is taken, or the factory fails.
    pub fn create_filter(
        &mut self,
        description: &PluginDescription,
        x: f64,
        y: f64,
        id: NodeId,
    ) -> Option<&GraphNode> {
        match self.instantiate(description, x, y, id) {
            Ok(id) => self.processor.node_for_id(id),
            Err(e) => {
                tracing::warn!("create_filter: {e}");
                None
            }
        }
    }

    /// Creates a node and records it in the model.
    ///
    /// Returns the new node's ID, or [`NodeId::INVALID`] after reporting the
    /// failure through the notifier.
    pub fn add_filter(
        &mut self,
        description: &PluginDescription,
        x: f64,
        y: f64,
        id: NodeId,
    ) -> NodeId {
        let id = match self.instantiate(description, x, y, id) {
            Ok(id) => id,
            Err(e) => {
                self.notifier
                    .report_error("Couldn't create filter", &e.to_string());
                return NodeId::INVALID;
            }
        };

        let name = self
            .processor
            .node_for_id(id)
            .map_or_else(|| description.name.clone(), GraphNode::name);
        self.model.nodes.push(NodeEntry {
            id: id.get(),
            name,
            x,
            y,
            state: None,
            plugin: description.clone(),
        });
        tracing::debug!("add_filter: {} as {id}", description.name);

        self.check_invariants();
        self.changed();
        id
    }

    /// Removes a node and every connection touching it.
    ///
    /// Returns `false` with no change (and no event) if `id` is unknown.
    pub fn remove_filter(&mut self, id: NodeId) -> bool {
        if !self.processor.remove_node(id) {
            return false;
        }
        self.model.nodes.retain(|n| n.id != id.get());
        tracing::debug!("remove_filter: {id}");
        self.processor_arcs_changed();
        true
    }

    /// Removes every connection touching `id`, keeping the node.
    pub fn disconnect_filter(&mut self, id: NodeId) -> bool {
        let changed = self.processor.disconnect_node(id);
        if changed {
            self.processor_arcs_changed();
        }
        changed
    }

    /// Prunes connections invalidated by a channel layout change.
    ///
    /// Call after any plugin's layout changes, even if it only grew: the
    /// render schedule is refreshed whether or not anything is pruned.
    pub fn remove_illegal_connections(&mut self) -> bool {
        let changed = self.processor.remove_illegal_connections();
        if changed {
            self.processor_arcs_changed();
        }
        changed
    }

    /// Moves a node in the layout.
    ///
    /// Returns `false` if `id` is unknown.
    pub fn set_node_position(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        let Some(node) = self.processor.node_for_id_mut(id) else {
            return false;
        };
        node.set_position(x, y);
        if let Some(entry) = self.model.node_mut(id) {
            entry.x = x;
            entry.y = y;
        }
        self.changed();
        true
    }

    // --- Connections ---

    /// Returns the number of connections.
    pub fn num_connections(&self) -> usize {
        self.processor.num_connections()
    }

    /// Returns the connection at `index`.
    pub fn connection(&self, index: usize) -> Option<&Connection> {
        self.processor.connection(index)
    }

    /// Finds the exact connection tuple.
    pub fn connection_between(
        &self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> Option<&Connection> {
        self.processor
            .connection_between(source_node, source_port, dest_node, dest_port)
    }

    /// Returns `true` if [`add_connection`](Self::add_connection) would
    /// succeed.
    pub fn can_connect(
        &self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        self.processor
            .can_connect(source_node, source_port, dest_node, dest_port)
    }

    /// Connects two ports, returning `false` with no change if any rule
    /// fails.
    pub fn add_connection(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        self.connect(source_node, source_port, dest_node, dest_port)
            .is_ok()
    }

    /// Connects two ports, reporting which rule failed.
    pub fn connect(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> Result<(), GraphError> {
        self.processor
            .connect(source_node, source_port, dest_node, dest_port)?;
        self.processor_arcs_changed();
        Ok(())
    }

    /// Removes the connection at `index`.
    pub fn remove_connection(&mut self, index: usize) -> bool {
        let changed = self.processor.remove_connection(index);
        if changed {
            self.processor_arcs_changed();
        }
        changed
    }

    /// Removes the exact connection tuple if present.
    pub fn remove_connection_between(
        &mut self,
        source_node: NodeId,
        source_port: u32,
        dest_node: NodeId,
        dest_port: u32,
    ) -> bool {
        let changed = self.processor.remove_connection_between(
            source_node,
            source_port,
            dest_node,
            dest_port,
        );
        if changed {
            self.processor_arcs_changed();
        }
        changed
    }

    // --- Whole-graph operations ---

    /// Replaces the session with `model`.
    ///
    /// Nodes are re-created under their stored IDs and stored state is
    /// restored. Entries whose plugin cannot be instantiated are pruned and
    /// the rest of the graph still loads. Stored connections are re-applied
    /// with [`GraphProcessor::restore_connection`], then the model's arcs
    /// are rebuilt from the live graph.
    pub fn set_node_model(&mut self, mut model: GraphModel) -> LoadReport {
        self.processor.clear();
        let entries = std::mem::take(&mut model.nodes);
        let arcs = std::mem::take(&mut model.arcs);
        self.model = model;

        // Stored IDs are reserved before any entry without one is allocated.
        let highest = entries.iter().map(|e| e.id).max().unwrap_or(0);
        self.last_uid = self.last_uid.max(highest);

        let mut report = LoadReport::default();
        let mut kept = Vec::with_capacity(entries.len());

        for mut entry in entries {
            let stored = entry.node_id();
            let id = match self.instantiate(&entry.plugin, entry.x, entry.y, stored) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("load: pruning {stored}: {e}");
                    report.pruned.push(stored);
                    continue;
                }
            };
            entry.id = id.get();

            if let Some(encoded) = entry.state.clone() {
                if let Err(e) = self.restore_state(id, &encoded) {
                    tracing::warn!("load: {e}");
                    report.bad_state.push(id);
                }
                if let Some(node) = self.processor.node_for_id_mut(id) {
                    node.set_property(keys::STATE, Property::Text(encoded));
                }
            }
            kept.push(entry);
        }
        self.model.nodes = kept;

        for arc in arcs {
            let c = arc.connection();
            if !self.processor.restore_connection(
                c.source_node,
                c.source_port,
                c.dest_node,
                c.dest_port,
            ) {
                report.dropped_arcs.push(arc);
            }
        }

        tracing::info!(
            "load: '{}' with {} nodes, {} connections",
            self.model.name,
            self.processor.num_nodes(),
            self.processor.num_connections()
        );
        self.processor_arcs_changed();
        report
    }

    /// Copies every plugin's current state into the model.
    ///
    /// Plugins that report empty state leave their entry untouched.
    pub fn save_plugin_states(&mut self) {
        let mut saved = 0usize;
        for entry in &mut self.model.nodes {
            let Some(node) = self.processor.node_for_id_mut(entry.node_id()) else {
                continue;
            };
            let state = node.lock_plugin().state();
            if state.is_empty() {
                continue;
            }
            let encoded = STANDARD.encode(&state);
            node.set_property(keys::STATE, Property::Text(encoded.clone()));
            entry.state = Some(encoded);
            saved += 1;
        }

        tracing::debug!("save_plugin_states: {saved} nodes");
        if saved > 0 {
            self.changed();
        }
    }

    /// Removes every node and connection, keeping the document's name.
    pub fn clear(&mut self) {
        self.processor.clear();
        self.model.nodes.clear();
        self.model.arcs.clear();
        tracing::debug!("graph_controller: cleared");
        self.changed();
    }

    // --- Internal helpers ---

    /// Validates, instantiates and registers one node.
    fn instantiate(
        &mut self,
        description: &PluginDescription,
        x: f64,
        y: f64,
        id: NodeId,
    ) -> Result<NodeId, SessionError> {
        description.validate()?;
        if self.processor.contains_node(id) {
            return Err(SessionError::DuplicateNode(id));
        }

        let plugin = self
            .factory
            .instantiate(description)
            .map_err(|message| SessionError::Instantiation {
                plugin: description.name.clone(),
                message,
            })?;

        let id = if id.is_valid() {
            self.last_uid = self.last_uid.max(id.get());
            id
        } else {
            self.next_uid()?
        };

        self.processor.add_node(plugin, id);
        if let Some(node) = self.processor.node_for_id_mut(id) {
            node.set_position(x, y);
        }
        Ok(id)
    }

    /// Decodes a stored state blob and hands it to the plugin.
    fn restore_state(&self, id: NodeId, encoded: &str) -> Result<(), SessionError> {
        let data = STANDARD
            .decode(encoded)
            .map_err(|source| SessionError::StateDecode { node: id, source })?;
        let Some(node) = self.processor.node_for_id(id) else {
            return Ok(());
        };
        node.lock_plugin()
            .set_state(&data)
            .map_err(|message| SessionError::StateRestore { node: id, message })
    }

    /// Rebuilds the model's arcs from the live connection list.
    ///
    /// The new list is built in full before it replaces the old one.
    fn processor_arcs_changed(&mut self) {
        let arcs: Vec<ArcEntry> = self
            .processor
            .connections()
            .iter()
            .map(ArcEntry::from)
            .collect();
        self.model.arcs = arcs;
        self.check_invariants();
        self.changed();
    }

    fn changed(&mut self) {
        let revision = self.events.publish();
        tracing::trace!(revision, "graph_changed");
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.model.nodes.len(),
            self.processor.num_nodes(),
            "model node count out of sync"
        );
        debug_assert_eq!(
            self.model.arcs.len(),
            self.processor.num_connections(),
            "model arc count out of sync"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use patchbay_core::{Plugin, PortCount};

    use super::*;

    #[derive(Default)]
    struct Stereo {
        state: Vec<u8>,
    }

    impl Plugin for Stereo {
        fn name(&self) -> &str {
            "Stereo"
        }
        fn port_count(&self) -> PortCount {
            PortCount::audio(2, 2)
        }
        fn process(&mut self, _: &[Vec<f32>], _: &mut [Vec<f32>], _: usize) {}
        fn state(&self) -> Vec<u8> {
            self.state.clone()
        }
        fn set_state(&mut self, data: &[u8]) -> Result<(), String> {
            if data.first() == Some(&0xFF) {
                return Err("corrupt".to_string());
            }
            self.state = data.to_vec();
            Ok(())
        }
    }

    fn factory(description: &PluginDescription) -> Result<Box<dyn Plugin>, String> {
        match description.identifier.as_str() {
            "stereo" => Ok(Box::new(Stereo::default())),
            other => Err(format!("unknown plugin '{other}'")),
        }
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl Notifier for Collect {
        fn report_error(&self, title: &str, message: &str) {
            self.0.lock().push(format!("{title}: {message}"));
        }
    }

    fn stereo() -> PluginDescription {
        PluginDescription::new("Stereo", "test", "stereo")
    }

    fn controller() -> GraphController {
        GraphController::new(GraphProcessor::new(48000.0, 64), factory)
    }

    fn assert_in_sync(c: &GraphController) {
        assert_eq!(c.model().nodes.len(), c.num_filters());
        assert_eq!(c.model().arcs.len(), c.num_connections());
    }

    #[test]
    fn test_two_node_example() {
        let mut c = controller();
        assert_eq!(c.add_filter(&stereo(), 0.0, 0.0, NodeId(1)), NodeId(1));
        assert_eq!(c.add_filter(&stereo(), 0.0, 0.0, NodeId(2)), NodeId(2));

        // Port 0 on a stereo node is an input, so connect output 2 → input 0.
        assert!(c.add_connection(NodeId(1), 2, NodeId(2), 0));
        assert_eq!(c.num_connections(), 1);
        assert!(!c.add_connection(NodeId(1), 2, NodeId(2), 0));
        assert_eq!(c.num_connections(), 1);

        assert!(c.remove_filter(NodeId(1)));
        assert_eq!(c.num_filters(), 1);
        assert_eq!(c.num_connections(), 0);
        assert_eq!(c.model().nodes.len(), 1);
        assert_in_sync(&c);
    }

    #[test]
    fn test_uids_strictly_increase() {
        let mut c = controller();
        let ids: Vec<NodeId> = (0..10).map(|_| c.next_uid().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(ids.iter().all(|id| id.is_valid()));
    }

    #[test]
    fn test_add_filter_allocates_and_records() {
        let mut c = controller();
        let events = c.subscribe();

        let id = c.add_filter(&stereo(), 12.0, 34.0, NodeId::INVALID);
        assert_eq!(id, NodeId(1));
        assert_eq!(events.try_recv(), Ok(GraphEvent::Changed { revision: 1 }));

        let entry = c.model().node(id).unwrap();
        assert_eq!((entry.x, entry.y), (12.0, 34.0));
        assert_eq!(entry.name, "Stereo");
        assert_eq!(c.node_for_id(id).unwrap().position(), (12.0, 34.0));

        // Explicit IDs push the counter forward.
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(10));
        assert_eq!(c.next_uid().unwrap(), NodeId(11));
    }

    #[test]
    fn test_add_filter_failures_report_and_leave_graph_alone() {
        let log = Collect::default();
        let mut c = controller().with_notifier(log.clone());
        let events = c.subscribe();

        let bad = PluginDescription::new("Nameless", "", "stereo");
        assert_eq!(c.add_filter(&bad, 0.0, 0.0, NodeId::INVALID), NodeId::INVALID);

        let unknown = PluginDescription::new("Ghost", "test", "ghost");
        assert_eq!(
            c.add_filter(&unknown, 0.0, 0.0, NodeId::INVALID),
            NodeId::INVALID
        );

        c.add_filter(&stereo(), 0.0, 0.0, NodeId(5));
        let _ = events.try_recv();
        assert_eq!(c.add_filter(&stereo(), 0.0, 0.0, NodeId(5)), NodeId::INVALID);

        let messages = log.0.lock();
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("invalid plugin description"));
        assert!(messages[1].contains("unknown plugin 'ghost'"));
        assert!(messages[2].contains("already exists"));
        assert_eq!(c.num_filters(), 1);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_create_filter_does_not_touch_model() {
        let mut c = controller();
        let node = c.create_filter(&stereo(), 1.0, 2.0, NodeId(3)).unwrap();
        assert_eq!(node.id(), NodeId(3));
        assert_eq!(node.position(), (1.0, 2.0));
        assert!(c.model().is_empty());
        assert_eq!(c.change_count(), 0);

        let unknown = PluginDescription::new("Ghost", "test", "ghost");
        assert!(c.create_filter(&unknown, 0.0, 0.0, NodeId(4)).is_none());
        assert_eq!(c.num_filters(), 1);
    }

    #[test]
    fn test_remove_unknown_is_silent() {
        let mut c = controller();
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(1));
        let events = c.subscribe();
        let before = c.model().clone();

        assert!(!c.remove_filter(NodeId(42)));
        assert!(!c.disconnect_filter(NodeId(42)));
        assert!(!c.remove_connection(0));
        assert!(!c.remove_connection_between(NodeId(1), 2, NodeId(42), 0));

        assert_eq!(c.model(), &before);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_connection_edits_resync_arcs() {
        let mut c = controller();
        for id in 1..=3 {
            c.add_filter(&stereo(), 0.0, 0.0, NodeId(id));
        }
        assert!(c.add_connection(NodeId(1), 2, NodeId(2), 0));
        assert!(c.add_connection(NodeId(2), 2, NodeId(3), 0));
        assert!(c.add_connection(NodeId(1), 3, NodeId(3), 1));
        assert!(matches!(
            c.connect(NodeId(3), 2, NodeId(1), 0),
            Err(GraphError::CycleDetected(_))
        ));
        assert_in_sync(&c);
        assert!(c.connection_between(NodeId(2), 2, NodeId(3), 0).is_some());
        assert!(c.can_connect(NodeId(1), 2, NodeId(3), 0));

        assert!(c.remove_connection_between(NodeId(2), 2, NodeId(3), 0));
        assert!(c.disconnect_filter(NodeId(1)));
        assert_eq!(c.num_connections(), 0);
        assert_in_sync(&c);
    }

    #[test]
    fn test_save_states_skips_empty() {
        let mut c = controller();
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(1));
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(2));
        c.node_for_id(NodeId(1))
            .unwrap()
            .lock_plugin()
            .set_state(&[1, 2, 3])
            .unwrap();

        c.save_plugin_states();
        assert_eq!(c.model().node(NodeId(1)).unwrap().state.as_deref(), Some("AQID"));
        assert!(c.model().node(NodeId(2)).unwrap().state.is_none());
        assert_eq!(
            c.node_for_id(NodeId(1))
                .unwrap()
                .property(keys::STATE)
                .and_then(Property::as_str),
            Some("AQID")
        );
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut c = controller();
        c.add_filter(&stereo(), 5.0, 6.0, NodeId(1));
        c.add_filter(&stereo(), 7.0, 8.0, NodeId(4));
        c.add_connection(NodeId(1), 2, NodeId(4), 0);
        c.add_connection(NodeId(1), 3, NodeId(4), 1);
        c.node_for_id(NodeId(4))
            .unwrap()
            .lock_plugin()
            .set_state(b"preset")
            .unwrap();
        c.save_plugin_states();

        let text = c.model().to_toml().unwrap();
        let mut loaded = controller();
        let report = loaded.set_node_model(GraphModel::from_toml(&text).unwrap());

        assert!(report.is_clean());
        assert_eq!(loaded.model(), c.model());
        assert_eq!(
            loaded.processor().connections(),
            c.processor().connections()
        );
        assert_eq!(
            loaded.node_for_id(NodeId(4)).unwrap().lock_plugin().state(),
            b"preset"
        );
        assert_eq!(loaded.node_for_id(NodeId(1)).unwrap().position(), (5.0, 6.0));
        assert_eq!(loaded.next_uid().unwrap(), NodeId(5));
    }

    #[test]
    fn test_load_prunes_failed_nodes() {
        let mut model = GraphModel::new("Partial");
        for (id, identifier) in [(1, "stereo"), (2, "missing"), (3, "stereo")] {
            model.nodes.push(NodeEntry {
                id,
                name: String::new(),
                x: 0.0,
                y: 0.0,
                state: None,
                plugin: PluginDescription::new("P", "test", identifier),
            });
        }
        let arc = |s, d| ArcEntry {
            source_node: s,
            source_port: 2,
            dest_node: d,
            dest_port: 0,
        };
        model.arcs = vec![arc(1, 2), arc(1, 3), arc(2, 3)];

        let mut c = controller();
        let events = c.subscribe();
        let report = c.set_node_model(model);

        assert_eq!(report.pruned, vec![NodeId(2)]);
        assert_eq!(report.dropped_arcs, vec![arc(1, 2), arc(2, 3)]);
        assert_eq!(c.num_filters(), 2);
        assert_eq!(c.model().arcs, vec![arc(1, 3)]);
        assert_eq!(c.model().name, "Partial");
        assert_in_sync(&c);
        assert!(events.try_recv().is_ok());
    }

    #[test]
    fn test_bad_state_is_not_fatal() {
        let mut model = GraphModel::default();
        for (id, state) in [(1, "%%%"), (2, "/w==")] {
            model.nodes.push(NodeEntry {
                id,
                name: String::new(),
                x: 0.0,
                y: 0.0,
                state: Some(state.to_string()),
                plugin: stereo(),
            });
        }

        let mut c = controller();
        let report = c.set_node_model(model);

        // "%%%" is not base64; "/w==" decodes to [0xFF], which the plugin rejects.
        assert_eq!(report.bad_state, vec![NodeId(1), NodeId(2)]);
        assert!(report.pruned.is_empty());
        assert_eq!(c.num_filters(), 2);
        assert!(c.node_for_id(NodeId(1)).unwrap().lock_plugin().state().is_empty());
    }

    #[test]
    fn test_reload_replaces_previous_graph() {
        let mut c = controller();
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(7));
        c.add_filter(&stereo(), 0.0, 0.0, NodeId(8));
        c.add_connection(NodeId(7), 2, NodeId(8), 0);

        let mut model = GraphModel::new("Other");
        model.nodes.push(NodeEntry {
            id: 2,
            name: "Stereo".to_string(),
            x: 0.0,
            y: 0.0,
            state: None,
            plugin: stereo(),
        });
        c.set_node_model(model);

        assert_eq!(c.num_filters(), 1);
        assert_eq!(c.num_connections(), 0);
        assert!(c.node_for_id(NodeId(7)).is_none());
        // IDs are never reused, even after a reload with lower IDs.
        assert_eq!(c.next_uid().unwrap(), NodeId(9));
    }

    fn entry(id: u32) -> NodeEntry {
        NodeEntry {
            id,
            name: "Stereo".to_string(),
            x: 0.0,
            y: 0.0,
            state: None,
            plugin: stereo(),
        }
    }

    #[test]
    fn test_load_reserves_stored_ids_before_allocating() {
        let mut model = GraphModel::new("Mixed");
        model.nodes.push(entry(0));
        model.nodes.push(entry(1));
        model.nodes.push(entry(0));
        model.arcs.push(ArcEntry {
            source_node: 1,
            source_port: 2,
            dest_node: 3,
            dest_port: 0,
        });

        let mut c = controller();
        let report = c.set_node_model(model);

        assert!(report.is_clean(), "{report:?}");
        let ids: Vec<u32> = c.model().nodes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
        assert_eq!(c.num_connections(), 1);
        assert!(c.connection_between(NodeId(1), 2, NodeId(3), 0).is_some());
        assert_eq!(c.next_uid().unwrap(), NodeId(4));
        assert_in_sync(&c);
    }

    #[test]
    fn test_exhausted_ids_are_reported_not_panicked() {
        let log = Collect::default();
        let mut c = controller().with_notifier(log.clone());

        let mut model = GraphModel::new("Full");
        model.nodes.push(entry(u32::MAX));
        let report = c.set_node_model(model);
        assert!(report.is_clean());
        assert!(c.node_for_id(NodeId(u32::MAX)).is_some());

        let events = c.subscribe();
        let id = c.add_filter(&stereo(), 0.0, 0.0, NodeId::INVALID);
        assert_eq!(id, NodeId::INVALID);
        assert_eq!(c.num_filters(), 1);
        assert!(events.try_recv().is_err());
        assert!(log.0.lock()[0].contains("no node IDs left"));
        assert!(c.create_filter(&stereo(), 0.0, 0.0, NodeId::INVALID).is_none());
        assert!(matches!(c.next_uid(), Err(SessionError::IdsExhausted)));

        // Explicit IDs below the ceiling still work.
        assert_eq!(c.add_filter(&stereo(), 0.0, 0.0, NodeId(5)), NodeId(5));
        assert_in_sync(&c);
    }

    #[test]
    fn test_clear_keeps_counter_and_name() {
        let mut c = controller();
        c.set_node_model(GraphModel::new("Keep"));
        c.add_filter(&stereo(), 0.0, 0.0, NodeId::INVALID);
        let events = c.subscribe();

        c.clear();
        assert_eq!(c.num_filters(), 0);
        assert!(c.model().nodes.is_empty());
        assert!(c.model().arcs.is_empty());
        assert_eq!(c.model().name, "Keep");
        assert!(events.try_recv().is_ok());
        assert_eq!(c.next_uid().unwrap(), NodeId(2));
    }

    #[test]
    fn test_set_node_position() {
        let mut c = controller();
        let id = c.add_filter(&stereo(), 0.0, 0.0, NodeId::INVALID);
        assert!(c.set_node_position(id, 3.5, -1.0));
        assert_eq!(c.node_for_id(id).unwrap().position(), (3.5, -1.0));
        let entry = c.model().node(id).unwrap();
        assert_eq!((entry.x, entry.y), (3.5, -1.0));
        assert!(!c.set_node_position(NodeId(99), 0.0, 0.0));
    }
}
