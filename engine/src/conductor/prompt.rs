//! Prompt fragments shared by the planner, executor and replanner

use serde_json::{Map, Value};

use super::state::TaskMode;
use crate::tools::ToolRegistry;

/// Heading plus one `- name: description` line per capability
pub fn capability_section(tools: &ToolRegistry) -> String {
    format!(
        "Available tools for when information gathering or actions are needed:\n{}",
        tools.render_catalog()
    )
}

/// Context rendered as indented JSON
pub fn render_context(context: &Map<String, Value>) -> String {
    serde_json::to_string_pretty(context).unwrap_or_else(|_| "{}".to_string())
}

/// Final-step requirement for every mode, one line each
pub fn final_step_requirements() -> String {
    TaskMode::ALL
        .iter()
        .map(|mode| {
            let purpose = match mode {
                TaskMode::Decision => {
                    "Analyze context to make decisions, with the FINAL step being to set pipeline variables"
                }
                TaskMode::Execution => {
                    "Analyze context and execute actions, with the FINAL step being to execute shell commands"
                }
            };
            format!(
                "- {} mode: {} using {} tool",
                title(mode.as_str()),
                purpose,
                mode.required_capability()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// When the executor should reach for each mode's required capability
pub fn mode_tool_requirements() -> String {
    TaskMode::ALL
        .iter()
        .map(|mode| {
            let when = match mode {
                TaskMode::Decision => "When you need to make a final decision",
                TaskMode::Execution => "When you need to execute commands",
            };
            format!(
                "- {} mode: {}, use {} tool",
                title(mode.as_str()),
                when,
                mode.required_capability()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn title(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Shorten text for log lines
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_step_requirements_name_capabilities() {
        let text = final_step_requirements();
        assert!(text.contains("- Decision mode:"));
        assert!(text.contains("using set_pipeline_variable tool"));
        assert!(text.contains("- Execution mode:"));
        assert!(text.contains("using execute_command tool"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 200), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_capability_section_with_no_tools() {
        let section = capability_section(&ToolRegistry::empty());
        assert!(section.ends_with("needed:\n"));
    }
}
