//! CLI command implementations.

pub mod common;
pub mod edit;
pub mod info;
pub mod plugins;
pub mod render;
