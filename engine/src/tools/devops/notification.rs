//! Build notifications
//!
//! Messages are composed with the current build's context and queued for
//! delivery through the log stream; no mail transport is contacted.

use async_trait::async_trait;
use chrono::Utc;
use sdk::{Capability, ToolResult};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::tools::VariableStore;

#[derive(Debug, Deserialize)]
struct NotificationRequest {
    #[serde(default)]
    recipients: Vec<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default = "default_severity")]
    severity: String,
}

fn default_severity() -> String {
    "info".to_string()
}

/// Build context stamped onto every notification
#[derive(Debug, Clone, Default)]
struct BuildStamp {
    build_id: Option<String>,
    build_number: Option<String>,
    project: Option<String>,
    source_branch: Option<String>,
    requested_for: Option<String>,
}

impl BuildStamp {
    fn from_store(store: &VariableStore) -> Self {
        Self {
            build_id: store.get("Build.BuildId"),
            build_number: store.get("Build.BuildNumber"),
            project: store.get("System.TeamProject"),
            source_branch: store.get("Build.SourceBranch"),
            requested_for: store.get("Build.RequestedFor"),
        }
    }
}

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("unknown")
}

/// `[project] Build number - SEVERITY` unless the caller supplied a subject
fn compose_subject(stamp: &BuildStamp, severity: &str, subject: Option<&str>) -> String {
    match subject.filter(|s| !s.trim().is_empty()) {
        Some(subject) => subject.to_string(),
        None => format!(
            "[{}] Build {} - {}",
            or_unknown(&stamp.project),
            or_unknown(&stamp.build_number),
            severity.to_uppercase()
        ),
    }
}

fn compose_body(stamp: &BuildStamp, message: &str, severity: &str, timestamp: &str) -> String {
    format!(
        "<h2>Azure DevOps Pipeline Notification</h2>\n\
         <p><strong>Message:</strong> {}</p>\n\
         <hr>\n\
         <h3>Build Information</h3>\n\
         <ul>\n\
         <li><strong>Project:</strong> {}</li>\n\
         <li><strong>Build Number:</strong> {}</li>\n\
         <li><strong>Build ID:</strong> {}</li>\n\
         <li><strong>Source Branch:</strong> {}</li>\n\
         <li><strong>Requested For:</strong> {}</li>\n\
         <li><strong>Severity:</strong> {}</li>\n\
         <li><strong>Timestamp:</strong> {}</li>\n\
         </ul>",
        message,
        or_unknown(&stamp.project),
        or_unknown(&stamp.build_number),
        or_unknown(&stamp.build_id),
        or_unknown(&stamp.source_branch),
        or_unknown(&stamp.requested_for),
        severity.to_uppercase(),
        timestamp
    )
}

/// Compose an email notification about the current build
#[derive(Debug, Clone)]
pub struct SendNotificationTool {
    store: Arc<VariableStore>,
}

impl SendNotificationTool {
    pub fn new(store: Arc<VariableStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Capability for SendNotificationTool {
    fn name(&self) -> &str {
        "send_notification"
    }

    fn description(&self) -> &str {
        "Send email notification with build information. Input: {\"recipients\": [\"a@b.com\"], \"message\": \"...\", \"subject\": \"optional\", \"severity\": \"info|warning|error\"}"
    }

    async fn execute(&self, input: &str) -> ToolResult {
        let request: NotificationRequest = match serde_json::from_str(input.trim()) {
            Ok(request) => request,
            Err(e) => {
                return ToolResult::failure(
                    self.name(),
                    format!("Invalid notification request: {}", e),
                )
            }
        };

        if request.recipients.is_empty() {
            return ToolResult::failure(self.name(), "recipients array is required");
        }
        if request.message.trim().is_empty() {
            return ToolResult::failure(self.name(), "message is required");
        }

        let stamp = BuildStamp::from_store(&self.store);
        let timestamp = Utc::now().to_rfc3339();
        let subject = compose_subject(&stamp, &request.severity, request.subject.as_deref());
        let body = compose_body(&stamp, &request.message, &request.severity, &timestamp);

        info!(
            severity = %request.severity.to_uppercase(),
            recipients = %request.recipients.join(", "),
            "Email notification: {}",
            request.message
        );
        debug!("Notification body:\n{}", body);

        let recipient_count = request.recipients.len();
        ToolResult::ok(
            self.name(),
            json!({
                "message": request.message,
                "severity": request.severity,
                "recipients": request.recipients,
                "subject": subject,
                "timestamp": timestamp,
                "buildId": stamp.build_id,
                "buildNumber": stamp.build_number,
                "project": stamp.project,
                "emailResult": {
                    "success": true,
                    "message": "Email notification queued",
                    "recipients": recipient_count,
                },
            }),
        )
    }
}
