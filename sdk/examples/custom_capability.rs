//! Example implementing a custom capability against the SDK contract

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde_json::json;

/// Counts the words in its input.
struct WordCount;

#[async_trait]
impl Capability for WordCount {
    fn name(&self) -> &str {
        "word_count"
    }

    fn description(&self) -> &str {
        "Count the whitespace-separated words in the input text"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        if input.trim().is_empty() {
            return ToolResult::failure(self.name(), "input text is empty");
        }
        ToolResult::ok(self.name(), json!({ "words": input.split_whitespace().count() }))
    }
}

#[tokio::main]
async fn main() {
    let capability = WordCount;
    println!("- {}: {}", capability.name(), capability.description());

    let ok = capability.execute("inspect the failing test results").await;
    println!("{}", ok.summary());
    println!("{}", ok.to_json());

    let failed = capability.execute("   ").await;
    println!("{}", failed.summary());
}
