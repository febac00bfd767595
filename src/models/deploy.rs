use serde::{Deserialize, Serialize};

/// Optional contact details the wizard collects for the notification
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserInfo {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// POST /api/deploy request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default)]
    pub project_name: String,
    pub user_info: Option<UserInfo>,
}

impl DeployRequest {
    pub fn is_complete(&self) -> bool {
        !self.file_id.trim().is_empty()
            && !self.repo_name.trim().is_empty()
            && !self.project_name.trim().is_empty()
    }
}

/// Authenticated GitHub user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GitHubUser {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }
}

/// GitHub repository as returned by the REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}

/// `{type, repo}` link between a hosting project and a git repository
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRepository {
    #[serde(rename = "type")]
    pub kind: String,
    pub repo: String,
}

impl GitRepository {
    pub fn github(full_name: &str) -> Self {
        Self {
            kind: "github".to_string(),
            repo: full_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VercelProject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VercelDeployment {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ready_state: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl VercelDeployment {
    pub fn public_url(&self) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!("https://{}", self.url)
        }
    }

    pub fn current_state(&self) -> &str {
        self.ready_state
            .as_deref()
            .or(self.state.as_deref())
            .unwrap_or("QUEUED")
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubDeployInfo {
    pub repo_name: String,
    pub repo_url: String,
    pub clone_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VercelDeployInfo {
    pub project_id: String,
    pub deployment_id: String,
    pub deployment_url: String,
    pub state: String,
}

/// POST /api/deploy response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeployResponse {
    pub success: bool,
    pub github: GitHubDeployInfo,
    pub vercel: VercelDeployInfo,
    pub message: String,
}

/// GET /api/csrf-token response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
    pub message: String,
}
