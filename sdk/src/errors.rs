//! Error types and handling
//!
//! This module provides the error types used throughout the Waypoint engine.
//! All errors implement the `WaypointErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! Errors raised inside a run never escape the run boundary: the engine turns
//! them into a failed run result. These types describe what went wrong before
//! or around a run (configuration, provider construction, invalid input).

use thiserror::Error;

/// Trait for Waypoint error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait WaypointErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require a change of configuration or input.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **LLM Provider**: Provider construction or missing credentials
/// - **Input**: Invalid mode or malformed run input
/// - **Tool**: Capability registry problems
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, WaypointErrorExt};
///
/// let error = EngineError::ToolNotFound("deploy".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::MissingCredentials("OPENAI_API_KEY".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    #[error("Missing credentials: environment variable {0} is not set")]
    MissingCredentials(String),

    // Input errors
    #[error("Invalid mode '{0}'. Must be one of: decision, execution")]
    InvalidMode(String),

    #[error("Objective is required but was not provided")]
    EmptyObjective,

    // Tool errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WaypointErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            // Configuration errors
            Self::Config(_) => "Check your config.toml file for errors",
            Self::PathCanonicalization(_, _) => "Invalid path specified",

            // LLM provider errors
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API keys and network",
            Self::UnsupportedProvider(_) => {
                "Set llm.provider to one of: ollama, openai, azure_openai"
            }
            Self::MissingCredentials(_) => "Export the API key environment variable and retry",

            // Input errors
            Self::InvalidMode(_) => "Use --mode decision or --mode execution",
            Self::EmptyObjective => "Provide a non-empty objective",

            // Tool errors
            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::DuplicateTool(_) => "Each tool must be registered under a unique name",
            Self::ToolError(_) => "Tool operation failed",

            // Generic IO error
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::UnsupportedProvider(_)
            | Self::MissingCredentials(_)
            | Self::InvalidMode(_)
            | Self::EmptyObjective
            | Self::DuplicateTool(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
