//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Execute one conductor run
//! - tools: List enabled tools
//! - config show / config path: Inspect the effective configuration

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

use crate::conductor::{Conductor, RunResult};
use crate::config::Config;
use crate::llm::build_provider;
use crate::tools::ToolRegistry;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Execute one run and print its result.
///
/// Returns the run result so the caller can pick the exit code. Provider and
/// tool setup failures are reported as errors before the run starts.
pub async fn handle_run(
    objective: String,
    mode: String,
    context: Option<String>,
    config: &Config,
    format: OutputFormat,
) -> Result<RunResult> {
    let llm = build_provider(&config.llm).context("Failed to configure LLM provider")?;
    let tools = ToolRegistry::from_config(&config.tools, &config.core.workspace)
        .context("Failed to register tools")?;

    tracing::info!(
        "Using {} provider with {} tools",
        llm.name(),
        tools.len()
    );

    let conductor =
        Conductor::new(llm, Arc::new(tools)).with_max_steps(config.agent.max_steps);

    // The context builder parses the string and drops anything unusable.
    let additional = context.map(Value::String).unwrap_or(Value::Null);
    let result = conductor.execute(&objective, &mode, additional).await;

    print_run_result(&result, format)?;
    Ok(result)
}

fn print_run_result(result: &RunResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            if result.success {
                println!("{}", result.response.as_deref().unwrap_or(""));
            } else {
                eprintln!(
                    "✗ Run failed: {}",
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
    }
    Ok(())
}

/// List the tools enabled in configuration
pub fn handle_tools(config: &Config, format: OutputFormat) -> Result<()> {
    let tools = ToolRegistry::from_config(&config.tools, &config.core.workspace)
        .context("Failed to register tools")?;

    match format {
        OutputFormat::Text => {
            if tools.is_empty() {
                println!("No tools enabled.");
                return Ok(());
            }
            println!("Enabled tools:");
            println!();
            for tool in tools.iter() {
                println!("  {}: {}", tool.name(), tool.description());
            }
        }
        OutputFormat::Json => {
            let entries: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name(),
                        "description": tool.description()
                    })
                })
                .collect();
            let output = json!({ "tools": entries });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let rendered = config.to_toml().context("Failed to render configuration")?;
            print!("{}", rendered);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
    }
    Ok(())
}

/// Print the path of the configuration file in use
pub fn handle_config_path(path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => {
            let output = json!({ "path": path.display().to_string() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
