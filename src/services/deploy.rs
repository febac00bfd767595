use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    DeployRequest, DeployResponse, GitHubDeployInfo, GitRepository, UserInfo, VercelDeployInfo,
};
use crate::services::vercel::generate_project_name;
use crate::services::{ArchiveService, GitHubClient, NotifyService, VercelClient};
use crate::storage::{check_upload_id, UploadStore};

const REPO_DESCRIPTION: &str = "Website deployed via Zip2Deploy";
const COMMIT_MESSAGE: &str = "Initial deployment from Zip2Deploy";

/// Upload → GitHub → Vercel pipeline
pub struct DeployService;

impl DeployService {
    pub async fn deploy(
        config: &Config,
        http: &Client,
        uploads: &dyn UploadStore,
        github_token: &str,
        req: DeployRequest,
    ) -> Result<DeployResponse> {
        if !req.is_complete() {
            return Err(AppError::BadRequest("Missing required parameters".to_string()));
        }
        let file_id = req.file_id.trim();
        check_upload_id(file_id)?;

        let vercel_token = config
            .vercel
            .token
            .as_deref()
            .ok_or_else(|| AppError::Internal("Vercel token is not configured".to_string()))?;

        // 1. Recover the archive accepted by the upload step
        let upload = uploads.get(file_id).await?;
        let files = ArchiveService::extract_in_background(upload.data.clone()).await?;
        if files.is_empty() {
            return Err(AppError::BadRequest("Archive contains no files".to_string()));
        }
        tracing::info!("Deploying upload {} ({} files)", file_id, files.len());

        // 2. Create the repository and commit the site
        let github = GitHubClient::new(http.clone(), &config.github.api_url, github_token);
        let repo = github
            .create_repository(req.repo_name.trim(), REPO_DESCRIPTION)
            .await?;
        github.upload_files(&repo, &files, COMMIT_MESSAGE).await?;

        // 3. Link a hosting project and trigger the first build
        let vercel = VercelClient::new(
            http.clone(),
            &config.vercel.api_url,
            vercel_token,
            config.vercel.team_id.clone(),
        );
        let git_repository = GitRepository::github(&repo.full_name);
        let project = vercel
            .create_project(&generate_project_name(&req.project_name), Some(&git_repository))
            .await?;
        let deployment = vercel
            .deploy_from_github(&project, &git_repository, &repo.default_branch)
            .await?;
        let deployment_url = deployment.public_url();

        // 4. Tell the team, if anyone is listening
        if let Some(webhook_url) = &config.notify.webhook_url {
            let user = match req.user_info {
                Some(user) => user,
                None => Self::github_contact(&github).await,
            };
            let text = NotifyService::deployment_message(&user, &repo.html_url, &deployment_url);
            NotifyService::send(http, webhook_url, text).await;
        }

        if let Err(e) = uploads.delete(file_id).await {
            tracing::warn!("Failed to remove deployed upload {}: {}", file_id, e);
        }

        tracing::info!(
            "Deployed {} to {} (project {}, deployment {})",
            repo.full_name,
            deployment_url,
            project.id,
            deployment.id
        );

        Ok(DeployResponse {
            success: true,
            github: GitHubDeployInfo {
                repo_name: repo.name,
                repo_url: repo.html_url,
                clone_url: repo.clone_url,
            },
            vercel: VercelDeployInfo {
                project_id: project.id,
                deployment_id: deployment.id.clone(),
                deployment_url,
                state: deployment.current_state().to_string(),
            },
            message: "Site deployed successfully!".to_string(),
        })
    }

    /// Contact details from the GitHub profile when the wizard sent none
    async fn github_contact(github: &GitHubClient) -> UserInfo {
        match github.get_user().await {
            Ok(user) => UserInfo {
                name: Some(user.display_name().to_string()),
                email: user.email,
            },
            Err(e) => {
                tracing::debug!("Could not read GitHub profile for notification: {}", e);
                UserInfo::default()
            }
        }
    }
}
