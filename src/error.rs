//! Error types for dockhand operations.
//!
//! These cover configuration, registration, and dispatch plumbing only.
//! Remote command outcomes are never errors — they resolve to `RunResult`
//! values and tool handlers report them as text.

use thiserror::Error;

/// Main error type for dockhand operations
#[derive(Error, Debug)]
pub enum DockhandError {
    /// Project root failed Warden validation
    #[error("invalid project at '{0}': {1}")]
    InvalidProject(String, String),

    /// Invalid configuration value
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Duplicate tool name registered at registry build time
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// Tool name not present in the registry
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments failed to deserialize
    #[error("invalid arguments for '{0}': {1}")]
    InvalidArguments(String, String),
}

/// Result type alias for dockhand operations
pub type Result<T> = std::result::Result<T, DockhandError>;
