//! Waypoint SDK
//!
//! Shared contract between the Waypoint engine and the capabilities it invokes.
//! Out-of-tree capabilities only need this crate.

/// Capability trait
pub mod capability;

/// Error types and handling
pub mod errors;

/// Capability result types
pub mod types;

// Re-export commonly used types
pub use capability::Capability;
pub use errors::{EngineError, WaypointErrorExt};
pub use types::ToolResult;
