use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use urlencoding::encode;

use crate::error::{AppError, Result};
use crate::models::{GitHubRepo, GitHubUser};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!("zip2deploy/", env!("CARGO_PKG_VERSION"));

#[derive(Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Deserialize)]
struct GitRef {
    object: ShaRef,
}

#[derive(Deserialize)]
struct GitCommit {
    tree: ShaRef,
}

/// One entry of a git tree creation request
#[derive(Debug, Serialize, PartialEq, Eq)]
struct TreeEntry {
    path: String,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: String,
}

/// Minimal GitHub REST client authenticated with a user access token
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(http: Client, api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| AppError::Unauthorized("Invalid GitHub token".to_string()))?,
        );
        Ok(headers)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{}", self.api_url, path);
        Ok(self.http.request(method, url).headers(self.headers()?))
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder, action: &str) -> Result<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("GitHub {} failed with {}: {}", action, status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    AppError::Unauthorized("Invalid GitHub token".to_string())
                }
                _ => AppError::Upstream(format!("Failed to {}", action)),
            });
        }
        Ok(resp.json().await?)
    }

    /// GET /user
    pub async fn get_user(&self) -> Result<GitHubUser> {
        Self::send(self.request(Method::GET, "/user")?, "get GitHub user information").await
    }

    /// POST /user/repos; a public repo initialised with a first commit
    pub async fn create_repository(&self, name: &str, description: &str) -> Result<GitHubRepo> {
        let builder = self.request(Method::POST, "/user/repos")?.json(&json!({
            "name": name,
            "description": description,
            "private": false,
            "auto_init": true,
        }));

        let resp = builder.send().await?;
        if resp.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(AppError::Conflict(
                "Repository name already exists. Please choose a different name.".to_string(),
            ));
        }
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized("Invalid GitHub token".to_string()));
        }
        if !resp.status().is_success() {
            tracing::warn!("GitHub create repository failed with {}", resp.status());
            return Err(AppError::Upstream("Failed to create GitHub repository".to_string()));
        }
        Ok(resp.json().await?)
    }

    /// Commit `files` on top of the repository's default branch
    pub async fn upload_files(
        &self,
        repo: &GitHubRepo,
        files: &BTreeMap<String, Vec<u8>>,
        message: &str,
    ) -> Result<String> {
        let base = repo_path(&repo.full_name)?;
        let branch = encode(&repo.default_branch).into_owned();

        let head: GitRef = Self::send(
            self.request(Method::GET, &format!("{}/git/ref/heads/{}", base, branch))?,
            "read branch reference",
        )
        .await?;
        let parent_sha = head.object.sha;

        let parent: GitCommit = Self::send(
            self.request(Method::GET, &format!("{}/git/commits/{}", base, parent_sha))?,
            "read latest commit",
        )
        .await?;

        let mut tree = Vec::with_capacity(files.len());
        for (path, content) in files {
            let blob: ShaRef = Self::send(
                self.request(Method::POST, &format!("{}/git/blobs", base))?
                    .json(&json!({
                        "content": general_purpose::STANDARD.encode(content),
                        "encoding": "base64",
                    })),
                "upload files to GitHub repository",
            )
            .await?;
            tree.push(tree_entry(path, blob.sha));
        }
        tracing::debug!("Created {} blobs in {}", tree.len(), repo.full_name);

        let new_tree: ShaRef = Self::send(
            self.request(Method::POST, &format!("{}/git/trees", base))?
                .json(&json!({ "base_tree": parent.tree.sha, "tree": tree })),
            "create git tree",
        )
        .await?;

        let commit: ShaRef = Self::send(
            self.request(Method::POST, &format!("{}/git/commits", base))?
                .json(&json!({
                    "message": message,
                    "tree": new_tree.sha,
                    "parents": [parent_sha],
                })),
            "create commit",
        )
        .await?;

        let _: serde_json::Value = Self::send(
            self.request(Method::PATCH, &format!("{}/git/refs/heads/{}", base, branch))?
                .json(&json!({ "sha": commit.sha })),
            "update branch reference",
        )
        .await?;

        tracing::info!("Pushed commit {} to {}", commit.sha, repo.full_name);
        Ok(commit.sha)
    }
}

/// `/repos/{owner}/{repo}` from a `owner/repo` full name
fn repo_path(full_name: &str) -> Result<String> {
    match full_name.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok(format!("/repos/{}/{}", encode(owner), encode(name)))
        }
        _ => Err(AppError::Upstream(format!("Unexpected repository name {:?}", full_name))),
    }
}

fn tree_entry(path: &str, sha: String) -> TreeEntry {
    TreeEntry {
        path: path.to_string(),
        mode: "100644",
        kind: "blob",
        sha,
    }
}
