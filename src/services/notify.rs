use reqwest::Client;
use serde_json::json;

use crate::models::UserInfo;

/// Best-effort chat webhook notifications
pub struct NotifyService;

impl NotifyService {
    pub fn deployment_message(user: &UserInfo, repo_url: &str, deployment_url: &str) -> String {
        format!(
            "New website deployed!\nUser: {} ({})\nRepo: {}\nURL: {}",
            user.name.as_deref().filter(|s| !s.is_empty()).unwrap_or("Anonymous"),
            user.email.as_deref().filter(|s| !s.is_empty()).unwrap_or("not-provided"),
            repo_url,
            deployment_url
        )
    }

    /// Post `{"text": ...}` to the webhook. Failures are logged, never returned.
    pub async fn send(http: &Client, webhook_url: &str, text: String) {
        let result = http
            .post(webhook_url)
            .json(&json!({ "text": text }))
            .send()
            .await
            .and_then(|resp| resp.error_for_status());

        match result {
            Ok(_) => tracing::debug!("Deployment notification sent"),
            Err(e) => tracing::warn!("Failed to send deployment notification: {}", e),
        }
    }
}
