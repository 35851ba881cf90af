//! Error types for session operations.

use std::path::PathBuf;

use patchbay_core::NodeId;
use thiserror::Error;

/// Errors that can occur while editing, loading or saving a graph session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to parse or serialize JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Plugin description is missing required fields
    #[error("invalid plugin description: {0}")]
    InvalidDescription(String),

    /// The plugin factory could not produce an instance
    #[error("failed to instantiate '{plugin}': {message}")]
    Instantiation {
        /// Name of the plugin that failed.
        plugin: String,
        /// Message reported by the factory.
        message: String,
    },

    /// A node with this ID is already in the graph
    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    /// Every node ID up to `u32::MAX` has been allocated
    #[error("no node IDs left to allocate")]
    IdsExhausted,

    /// Stored state blob is not valid base64
    #[error("state of {node} is not valid base64: {source}")]
    StateDecode {
        /// Node whose state was being restored.
        node: NodeId,
        /// Underlying decode error.
        #[source]
        source: base64::DecodeError,
    },

    /// The plugin rejected a decoded state blob
    #[error("{node} rejected stored state: {message}")]
    StateRestore {
        /// Node whose state was being restored.
        node: NodeId,
        /// Message reported by the plugin.
        message: String,
    },
}

impl SessionError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
