use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::models::{GitRepository, VercelDeployment, VercelProject};

const TEAM_HEADER: &str = "x-vercel-team-id";
const MAX_PROJECT_NAME: usize = 63;

/// Vercel REST client for project creation and git deployments
pub struct VercelClient {
    http: Client,
    api_url: String,
    token: String,
    team_id: Option<String>,
}

impl VercelClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
        team_id: Option<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            team_id,
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| AppError::Internal("Invalid Vercel token".to_string()))?,
        );
        if let Some(team_id) = &self.team_id {
            headers.insert(
                HeaderName::from_static(TEAM_HEADER),
                HeaderValue::from_str(team_id)
                    .map_err(|_| AppError::Internal("Invalid Vercel team id".to_string()))?,
            );
        }
        let url = format!("{}{}", self.api_url, path);
        Ok(self.http.request(method, url).headers(headers))
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder, action: &str) -> Result<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body: Value = resp.json().await.unwrap_or(Value::Null);
            let detail = error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::warn!("Vercel {} failed with {}: {}", action, status, detail);
            return Err(AppError::Upstream(format!("Failed to {}: {}", action, detail)));
        }
        Ok(resp.json().await?)
    }

    /// POST /v9/projects
    pub async fn create_project(
        &self,
        name: &str,
        git_repository: Option<&GitRepository>,
    ) -> Result<VercelProject> {
        let mut payload = json!({ "name": name, "framework": null });
        if let Some(repo) = git_repository {
            payload["gitRepository"] = json!(repo);
        }
        Self::send(
            self.request(Method::POST, "/v9/projects")?.json(&payload),
            "create Vercel project",
        )
        .await
    }

    /// POST /v13/deployments from the repository's `main` branch
    pub async fn deploy_from_github(
        &self,
        project: &VercelProject,
        git_repository: &GitRepository,
        git_ref: &str,
    ) -> Result<VercelDeployment> {
        let payload = json!({
            "name": project.name,
            "project": project.id,
            "gitSource": {
                "type": git_repository.kind,
                "repo": git_repository.repo,
                "ref": git_ref,
            },
            "projectSettings": {
                "framework": null,
                "buildCommand": null,
                "outputDirectory": null,
                "installCommand": null,
                "devCommand": null,
            },
        });
        Self::send(
            self.request(Method::POST, "/v13/deployments")?.json(&payload),
            "deploy from GitHub",
        )
        .await
    }
}

/// `error.message`, `error` (string) or `message` from an API error body
fn error_message(body: &Value) -> Option<String> {
    body.pointer("/error/message")
        .or_else(|| body.get("error").filter(|v| v.is_string()))
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Turn a user supplied name into a valid, unique Vercel project name
pub fn generate_project_name(original: &str) -> String {
    let suffix = Utc::now().timestamp_millis().to_string();
    let suffix = &suffix[suffix.len().saturating_sub(6)..];
    format!("{}-{}", normalize_project_name(original), suffix)
}

/// Lowercase, `[a-z0-9-]` only, no repeated or edge dashes, starts with a
/// letter, at most 63 characters
pub fn normalize_project_name(original: &str) -> String {
    let mut name = String::with_capacity(original.len());
    for c in original.to_lowercase().chars() {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' };
        if c == '-' && name.ends_with('-') {
            continue;
        }
        name.push(c);
    }
    let mut name = name.trim_matches('-').to_string();

    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        name = format!("site-{}", name);
    }

    if name.len() > MAX_PROJECT_NAME {
        name.truncate(MAX_PROJECT_NAME);
        name = name.trim_end_matches('-').to_string();
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_project_name() {
        assert_eq!(normalize_project_name("My Cool Site!"), "my-cool-site");
        assert_eq!(normalize_project_name("--a__b--"), "a-b");
        assert_eq!(normalize_project_name("123go"), "site-123go");
        assert_eq!(normalize_project_name("אתר"), "site-");
        let long = "a".repeat(100);
        assert_eq!(normalize_project_name(&long).len(), 63);
        let dashed = format!("{}-b", "a".repeat(62));
        assert_eq!(normalize_project_name(&dashed), "a".repeat(62));
    }

    #[test]
    fn test_generate_project_name_suffix() {
        let name = generate_project_name("Portfolio");
        let (base, suffix) = name.rsplit_once('-').unwrap();
        assert_eq!(base, "portfolio");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "error": { "message": "bad name" } })).as_deref(),
            Some("bad name")
        );
        assert_eq!(error_message(&json!({ "error": "nope" })).as_deref(), Some("nope"));
        assert_eq!(error_message(&json!({ "message": "m" })).as_deref(), Some("m"));
        assert_eq!(error_message(&Value::Null), None);
    }
}
