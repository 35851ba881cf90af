//! Built-in plugin registry and factory for patchbay.
//!
//! This crate provides a small set of internal plugins and a registry that
//! instantiates them by identifier. The registry implements
//! [`PluginFactory`] for the `"builtin"` format, so it can drive a
//! [`GraphController`](patchbay_session::GraphController) directly.
//!
//! # Features
//!
//! - **Plugin Discovery**: List all built-in plugins with metadata
//! - **Factory Pattern**: Create plugins by identifier at runtime
//! - **Category System**: Plugins organized by role (generator, effect, ...)
//! - **Descriptions**: Ready-made [`PluginDescription`]s for graph documents
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{GraphProcessor, NodeId};
//! use patchbay_registry::PluginRegistry;
//! use patchbay_session::GraphController;
//!
//! let registry = PluginRegistry::new();
//! let tone = registry.description("tone").unwrap();
//! let gain = registry.description("gain").unwrap();
//!
//! let mut controller = GraphController::new(GraphProcessor::new(48000.0, 256), registry);
//! let a = controller.add_filter(&tone, 0.0, 0.0, NodeId::INVALID);
//! let b = controller.add_filter(&gain, 200.0, 0.0, NodeId::INVALID);
//!
//! // Tone outputs are ports 0/1, gain inputs are ports 0/1.
//! assert!(controller.add_connection(a, 0, b, 0));
//! assert!(controller.add_connection(a, 1, b, 1));
//! ```

pub mod plugins;

use patchbay_core::{Plugin, PortCount};
use patchbay_session::{PluginDescription, PluginFactory};

pub use plugins::{Gain, MidiThru, Mixer, Tone};

/// Plugin format handled by [`PluginRegistry`].
pub const FORMAT: &str = "builtin";

/// Manufacturer recorded in built-in plugin descriptions.
pub const MANUFACTURER: &str = "Patchbay";

/// Role of a built-in plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginCategory {
    /// Produces signal without audio inputs
    Generator,
    /// Transforms audio
    Effect,
    /// Routing and mixing helpers
    Utility,
    /// MIDI-only processors
    Midi,
}

impl PluginCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            PluginCategory::Generator => "Generator",
            PluginCategory::Effect => "Effect",
            PluginCategory::Utility => "Utility",
            PluginCategory::Midi => "MIDI",
        }
    }
}

/// Describes a plugin in the registry.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Unique identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description of the plugin.
    pub description: &'static str,
    /// Category for organization.
    pub category: PluginCategory,
    /// Channel layout of a fresh instance.
    pub ports: PortCount,
}

/// Factory function type for creating plugins.
type Constructor = fn() -> Box<dyn Plugin>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: PluginDescriptor,
    constructor: Constructor,
}

/// Registry of all built-in plugins.
pub struct PluginRegistry {
    entries: Vec<RegistryEntry>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// Create a new registry with all built-in plugins registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(4),
        };
        registry.register_builtin_plugins();
        registry
    }

    fn register_builtin_plugins(&mut self) {
        self.register(
            PluginDescriptor {
                id: "tone",
                name: "Tone",
                description: "Stereo sine generator",
                category: PluginCategory::Generator,
                ports: Tone::new().port_count(),
            },
            || Box::new(Tone::new()),
        );

        self.register(
            PluginDescriptor {
                id: "gain",
                name: "Gain",
                description: "Stereo linear gain stage",
                category: PluginCategory::Effect,
                ports: Gain::new().port_count(),
            },
            || Box::new(Gain::new()),
        );

        self.register(
            PluginDescriptor {
                id: "mixer",
                name: "Mixer",
                description: "Sums two stereo pairs into one",
                category: PluginCategory::Utility,
                ports: Mixer.port_count(),
            },
            || Box::new(Mixer),
        );

        self.register(
            PluginDescriptor {
                id: "midi-thru",
                name: "MIDI Thru",
                description: "Routes MIDI from one input to one output",
                category: PluginCategory::Midi,
                ports: MidiThru.port_count(),
            },
            || Box::new(MidiThru),
        );
    }

    fn register(&mut self, descriptor: PluginDescriptor, constructor: Constructor) {
        self.entries.push(RegistryEntry {
            descriptor,
            constructor,
        });
    }

    /// Returns descriptors for all registered plugins.
    pub fn all_plugins(&self) -> Vec<&PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor).collect()
    }

    /// Returns descriptors for plugins in a specific category.
    pub fn plugins_in_category(&self, category: PluginCategory) -> Vec<&PluginDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.category == category)
            .map(|e| &e.descriptor)
            .collect()
    }

    /// Get a descriptor by plugin ID.
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Create a plugin instance by ID.
    pub fn create(&self, id: &str) -> Option<Box<dyn Plugin>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.constructor)())
    }

    /// Builds the graph-document description for a plugin ID.
    pub fn description(&self, id: &str) -> Option<PluginDescription> {
        let descriptor = self.get(id)?;
        Some(
            PluginDescription::new(descriptor.name, FORMAT, descriptor.id)
                .with_manufacturer(MANUFACTURER)
                .with_version(env!("CARGO_PKG_VERSION")),
        )
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no plugins are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PluginFactory for PluginRegistry {
    fn instantiate(&self, description: &PluginDescription) -> Result<Box<dyn Plugin>, String> {
        if description.format != FORMAT {
            return Err(format!("unsupported plugin format '{}'", description.format));
        }
        self.create(&description.identifier)
            .ok_or_else(|| format!("no built-in plugin '{}'", description.identifier))
    }
}
