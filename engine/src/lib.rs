//! Waypoint Engine Library
//!
//! This library provides the core functionality of the waypoint agent.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// LLM provider abstraction layer
pub mod llm;

/// Conductor orchestration module
pub mod conductor;

/// Built-in capabilities
pub mod tools;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
