//! Capability result types

use serde::{Deserialize, Serialize};

/// Outcome of a single capability invocation.
///
/// `success == false` means `result` carries no authoritative value and
/// `error` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the capability that produced this result
    pub name: String,

    /// Arbitrary JSON payload (`null` on failure or when there is nothing to return)
    pub result: serde_json::Value,

    /// Whether the invocation succeeded
    pub success: bool,

    /// Failure description, present iff `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result carrying a JSON payload
    pub fn ok(name: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            result,
            success: true,
            error: None,
        }
    }

    /// Create a successful result carrying text
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::ok(name, serde_json::Value::String(text.into()))
    }

    /// Create a failed result
    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            result: serde_json::Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Create a failed result that still reports a diagnostic payload
    /// (e.g. a command's captured output alongside a non-zero exit).
    pub fn failure_with(
        name: impl Into<String>,
        result: serde_json::Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            result,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Render as an outcome line: `name: <json result>` on success,
    /// `name: <error>` on failure. A failure that still carries a payload
    /// (captured command output) appends it as JSON so it is not lost.
    pub fn summary(&self) -> String {
        if self.success {
            return format!("{}: {}", self.name, self.result);
        }

        let error = self.error.as_deref().unwrap_or("unknown error");
        if self.result.is_null() {
            format!("{}: {}", self.name, error)
        } else {
            format!("{}: {} {}", self.name, error, self.result)
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
