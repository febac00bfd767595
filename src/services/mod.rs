pub mod archive;
pub mod deploy;
pub mod github;
pub mod notify;
pub mod upload;
pub mod vercel;

pub use archive::ArchiveService;
pub use deploy::DeployService;
pub use github::GitHubClient;
pub use notify::NotifyService;
pub use upload::UploadService;
pub use vercel::VercelClient;
