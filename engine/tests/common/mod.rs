//! Shared helpers for engine integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use waypoint_engine::llm::{LLMError, LLMProvider, Message, Result};

/// Oracle that replays canned responses, then repeats the last one forever
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<Option<String>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone()
            .ok_or_else(|| LLMError::ProviderUnavailable("no scripted response".into()))
    }
}

/// Oracle that routes on the role of the prompt it receives
pub struct RoleProvider {
    pub planner: String,
    pub executor: String,
    pub replanner: String,
}

#[async_trait]
impl LLMProvider for RoleProvider {
    fn name(&self) -> &str {
        "role"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        let system = &messages[0].content;
        if system.contains("execution agent") {
            Ok(self.executor.clone())
        } else if system.contains("replanning agent") {
            Ok(self.replanner.clone())
        } else {
            Ok(self.planner.clone())
        }
    }
}

/// Capability that answers with a fixed tag after a delay
pub struct DelayedTool {
    name: &'static str,
    delay: Duration,
}

impl DelayedTool {
    pub fn new(name: &'static str, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            name,
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[async_trait]
impl Capability for DelayedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "answers with its input after a fixed delay"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        tokio::time::sleep(self.delay).await;
        ToolResult::text(self.name, input)
    }
}
