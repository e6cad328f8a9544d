//! Capability trait
//!
//! A capability is a named, independently invocable operation the executor may
//! dispatch to. Its description is rendered verbatim into prompts, so it doubles
//! as the documentation the model reasons over.

use async_trait::async_trait;

use crate::types::ToolResult;

/// Trait that all capabilities must implement
///
/// Implementations must tolerate being invoked zero or more times with the same
/// input; the engine does not deduplicate invocations. Failures are reported in
/// the returned [`ToolResult`], never by panicking.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Unique name used for dispatch (exact match)
    fn name(&self) -> &str;

    /// Human-readable description rendered into prompts
    fn description(&self) -> &str;

    /// Execute the capability with a free-form input string
    async fn execute(&self, input: &str) -> ToolResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl Capability for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn description(&self) -> &str {
            "Upper-case the input"
        }

        async fn execute(&self, input: &str) -> ToolResult {
            if input.is_empty() {
                return ToolResult::failure(self.name(), "input is empty");
            }
            ToolResult::text(self.name(), input.to_uppercase())
        }
    }

    #[tokio::test]
    async fn test_capability_as_trait_object() {
        let cap: Box<dyn Capability> = Box::new(Upper);
        assert_eq!(cap.name(), "upper");
        assert_eq!(cap.description(), "Upper-case the input");

        let result = cap.execute("abc").await;
        assert!(result.success);
        assert_eq!(result.result, serde_json::json!("ABC"));

        let result = cap.execute("").await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("input is empty"));
    }
}
