//! The plugin instantiation boundary.
//!
//! The controller never knows how plugins are found or loaded. It hands a
//! [`PluginDescription`] to a [`PluginFactory`] and gets back either a ready
//! instance or a message explaining the failure.

use patchbay_core::Plugin;

use crate::model::PluginDescription;

/// Creates plugin instances from descriptions.
///
/// Implemented for any `Fn(&PluginDescription) -> Result<Box<dyn Plugin>, String>`,
/// so tests and small hosts can pass a closure.
pub trait PluginFactory: Send {
    /// Instantiate the plugin `description` refers to.
    fn instantiate(&self, description: &PluginDescription) -> Result<Box<dyn Plugin>, String>;
}

impl<F> PluginFactory for F
where
    F: Fn(&PluginDescription) -> Result<Box<dyn Plugin>, String> + Send,
{
    fn instantiate(&self, description: &PluginDescription) -> Result<Box<dyn Plugin>, String> {
        self(description)
    }
}
