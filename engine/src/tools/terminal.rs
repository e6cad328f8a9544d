//! Shell command capability
//!
//! Runs the input through the platform shell (`sh -c`, or `cmd /c` on
//! Windows) inside the workspace. The result always reports the captured
//! output; `success` is true only for a zero exit code.

use async_trait::async_trait;
use sdk::{Capability, ToolResult};
use serde_json::json;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ExecuteCommandTool {
    work_dir: PathBuf,
    timeout: Duration,
}

impl ExecuteCommandTool {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn shell_command(command: &str) -> Command {
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/c");
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c");
            c
        };
        cmd.arg(command);
        cmd
    }
}

#[async_trait]
impl Capability for ExecuteCommandTool {
    fn name(&self) -> &str {
        "execute_command"
    }

    fn description(&self) -> &str {
        "Execute a shell command"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let command = input.trim();
        if command.is_empty() {
            return ToolResult::failure(self.name(), "Empty command");
        }

        info!("Executing command: {}", command);
        debug!("Working directory: {}", self.work_dir.display());

        let child = Self::shell_command(command)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("Command failed to start: {}", e);
                return ToolResult::failure_with(
                    self.name(),
                    json!({ "command": command, "error": e.to_string() }),
                    format!("Failed to start command: {}", e),
                );
            }
            Err(_) => {
                let err_msg = format!(
                    "Command timed out after {} seconds",
                    self.timeout.as_secs()
                );
                warn!("{}", err_msg);
                return ToolResult::failure_with(
                    self.name(),
                    json!({ "command": command, "error": err_msg }),
                    err_msg,
                );
            }
        };

        let exit_code = output.status.code();
        let result = json!({
            "command": command,
            "exitCode": exit_code,
            "stdout": String::from_utf8_lossy(&output.stdout).trim(),
            "stderr": String::from_utf8_lossy(&output.stderr).trim(),
            "workingDirectory": self.work_dir.display().to_string(),
        });

        if output.status.success() {
            info!("Command completed with exit code 0");
            ToolResult::ok(self.name(), result)
        } else {
            warn!("Command failed with exit code: {:?}", exit_code);
            let error = match exit_code {
                Some(code) => format!("Command exited with code {}", code),
                None => "Command terminated by signal".to_string(),
            };
            ToolResult::failure_with(self.name(), result, error)
        }
    }
}
