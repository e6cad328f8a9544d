//! Initial context assembly
//!
//! Builds the `context` map a run starts with: the run mode, a timestamp, and
//! whatever additional context the caller supplied. Additional context may be
//! a JSON object or a string holding one; anything else is logged and dropped
//! so a malformed overlay never prevents the run from starting.

use serde_json::{Map, Value};
use tracing::warn;

use super::state::{TaskMode, MODE_KEY};

#[derive(Debug, Clone)]
pub struct ContextBuilder {
    mode: TaskMode,
    additional: Value,
}

impl ContextBuilder {
    pub fn new(mode: TaskMode) -> Self {
        Self {
            mode,
            additional: Value::Null,
        }
    }

    /// Overlay caller-supplied context
    pub fn with_additional(mut self, additional: Value) -> Self {
        self.additional = additional;
        self
    }

    pub fn build(&self) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert(MODE_KEY.to_string(), Value::from(self.mode.as_str()));
        context.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        for (key, value) in self.overlay() {
            if key == MODE_KEY {
                warn!("Additional context may not override the run mode; ignoring 'mode'");
                continue;
            }
            context.insert(key, value);
        }

        context
    }

    fn overlay(&self) -> Map<String, Value> {
        match &self.additional {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            Value::String(raw) if raw.trim().is_empty() => Map::new(),
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    warn!("Additional context is not a JSON object; ignoring it");
                    Map::new()
                }
                Err(e) => {
                    warn!("Failed to parse additional context: {}", e);
                    Map::new()
                }
            },
            _ => {
                warn!("Additional context is not a JSON object; ignoring it");
                Map::new()
            }
        }
    }
}
