//! Property-based tests for controller invariants under random edit
//! sequences.

use patchbay_core::{GraphProcessor, NodeId, Plugin, PortCount};
use patchbay_session::{GraphController, GraphModel, PluginDescription};
use proptest::prelude::*;

struct Stereo(Vec<u8>);

impl Plugin for Stereo {
    fn name(&self) -> &str {
        "Stereo"
    }
    fn port_count(&self) -> PortCount {
        PortCount::audio(2, 2)
    }
    fn process(&mut self, _: &[Vec<f32>], _: &mut [Vec<f32>], _: usize) {}
    fn state(&self) -> Vec<u8> {
        self.0.clone()
    }
    fn set_state(&mut self, data: &[u8]) -> Result<(), String> {
        self.0 = data.to_vec();
        Ok(())
    }
}

fn factory(description: &PluginDescription) -> Result<Box<dyn Plugin>, String> {
    if description.identifier == "stereo" {
        Ok(Box::new(Stereo(Vec::new())))
    } else {
        Err("not available".to_string())
    }
}

fn controller() -> GraphController {
    GraphController::new(GraphProcessor::new(48000.0, 64), factory)
}

#[derive(Debug, Clone)]
enum Edit {
    Add,
    AddBroken,
    Remove(u32),
    Connect(u32, u32, u32, u32),
    Disconnect(u32),
    SetState(u32, Vec<u8>),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => Just(Edit::Add),
        1 => Just(Edit::AddBroken),
        2 => (1u32..12).prop_map(Edit::Remove),
        4 => (1u32..12, 2u32..4, 1u32..12, 0u32..2)
            .prop_map(|(s, sp, d, dp)| Edit::Connect(s, sp, d, dp)),
        1 => (1u32..12).prop_map(Edit::Disconnect),
        1 => (1u32..12, prop::collection::vec(any::<u8>(), 0..8))
            .prop_map(|(id, data)| Edit::SetState(id, data)),
    ]
}

fn apply(c: &mut GraphController, edit: &Edit) {
    let stereo = PluginDescription::new("Stereo", "test", "stereo");
    let broken = PluginDescription::new("Broken", "test", "broken");
    match edit {
        Edit::Add => {
            c.add_filter(&stereo, 0.0, 0.0, NodeId::INVALID);
        }
        Edit::AddBroken => {
            c.add_filter(&broken, 0.0, 0.0, NodeId::INVALID);
        }
        Edit::Remove(id) => {
            c.remove_filter(NodeId(*id));
        }
        Edit::Connect(s, sp, d, dp) => {
            c.add_connection(NodeId(*s), *sp, NodeId(*d), *dp);
        }
        Edit::Disconnect(id) => {
            c.disconnect_filter(NodeId(*id));
        }
        Edit::SetState(id, data) => {
            if let Some(node) = c.node_for_id(NodeId(*id)) {
                node.lock_plugin().set_state(data).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// After every edit the model mirrors the live graph entry for entry.
    #[test]
    fn model_tracks_processor(edits in prop::collection::vec(edit(), 0..40)) {
        let mut c = controller();
        for edit in &edits {
            apply(&mut c, edit);
            prop_assert_eq!(c.model().nodes.len(), c.num_filters());
            prop_assert_eq!(c.model().arcs.len(), c.num_connections());
            for (arc, live) in c.model().arcs.iter().zip(c.processor().connections()) {
                prop_assert_eq!(arc.connection(), *live);
            }
        }
    }

    /// Saving, serializing and reloading reproduces IDs, connections and
    /// plugin state.
    #[test]
    fn reload_reproduces_graph(edits in prop::collection::vec(edit(), 0..40)) {
        let mut c = controller();
        for edit in &edits {
            apply(&mut c, edit);
        }
        c.save_plugin_states();

        let json = c.model().to_json().unwrap();
        let mut loaded = controller();
        let report = loaded.set_node_model(GraphModel::from_json(&json).unwrap());
        prop_assert!(report.is_clean());

        let ids: Vec<NodeId> = c.processor().nodes().map(|n| n.id()).collect();
        let loaded_ids: Vec<NodeId> = loaded.processor().nodes().map(|n| n.id()).collect();
        prop_assert_eq!(ids, loaded_ids);
        prop_assert_eq!(c.processor().connections(), loaded.processor().connections());

        for node in c.processor().nodes() {
            let original = node.lock_plugin().state();
            let restored = loaded.node_for_id(node.id()).unwrap().lock_plugin().state();
            prop_assert_eq!(original, restored);
        }
    }

    /// Allocated IDs strictly increase no matter how the graph is edited.
    #[test]
    fn uids_never_repeat(edits in prop::collection::vec(edit(), 0..30), extra in 1usize..20) {
        let mut c = controller();
        for edit in &edits {
            apply(&mut c, edit);
        }
        let mut previous = c.next_uid().unwrap();
        for _ in 0..extra {
            let id = c.next_uid().unwrap();
            prop_assert!(id > previous);
            previous = id;
        }
    }
}
