use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub vercel: VercelConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
    /// How long an accepted upload stays available for deployment
    #[serde(default = "default_upload_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_local_path")]
    pub local_path: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_seconds: u64,
    #[serde(default)]
    pub cookie_secure: bool,
    #[serde(default = "default_true")]
    pub csrf_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VercelConfig {
    #[serde(default = "default_vercel_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024 // 20MB
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "application/zip".to_string(),
        "application/x-zip-compressed".to_string(),
    ]
}

fn default_upload_ttl() -> u64 {
    3600 // 1 hour
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}

fn default_local_path() -> String {
    "data/uploads".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_session_ttl() -> u64 {
    86400 // 24 hours
}

fn default_true() -> bool {
    true
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_vercel_api_url() -> String {
    "https://api.vercel.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
            ttl_seconds: default_upload_ttl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            local_path: default_local_path(),
            sweep_interval_seconds: default_sweep_interval(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_session_ttl(),
            cookie_secure: false,
            csrf_enabled: true,
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
        }
    }
}

impl Default for VercelConfig {
    fn default() -> Self {
        Self {
            api_url: default_vercel_api_url(),
            token: None,
            team_id: None,
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.ensure_directories()?;
        tracing::info!(
            "Upload limits: max_file_size={}, allowed_mime_types={:?}, storage={:?}",
            config.upload.max_file_size,
            config.upload.allowed_mime_types,
            config.storage.backend
        );
        Ok(config)
    }

    /// Load configuration from config.toml
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["config.toml", "data/config.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides.
    /// Format: ZD_CONF_<SECTION>_<KEY>, plus the plain names the wizard
    /// deployment has always used (MAX_FILE_SIZE, VERCEL_TOKEN, ...).
    fn apply_env_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| var(k));

        // Server overrides
        if let Some(val) = var("ZD_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(val) = first(&["ZD_CONF_SERVER_PORT", "PORT"]) {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }

        // Upload overrides
        if let Some(val) = first(&["ZD_CONF_UPLOAD_MAX_FILE_SIZE", "MAX_FILE_SIZE"]) {
            if let Ok(size) = val.trim().parse() {
                self.upload.max_file_size = size;
            }
        }
        if let Some(val) = first(&["ZD_CONF_UPLOAD_ALLOWED_MIME_TYPES", "ALLOWED_MIME_TYPES"]) {
            let mimes: Vec<String> = val
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect();
            if !mimes.is_empty() {
                self.upload.allowed_mime_types = mimes;
            }
        }
        if let Some(val) = var("ZD_CONF_UPLOAD_TTL") {
            if let Ok(secs) = val.parse() {
                self.upload.ttl_seconds = secs;
            }
        }

        // Storage overrides
        if let Some(val) = var("ZD_CONF_STORAGE_BACKEND") {
            match val.trim().to_lowercase().as_str() {
                "memory" => self.storage.backend = StorageBackend::Memory,
                "local" => self.storage.backend = StorageBackend::Local,
                other => tracing::warn!("Ignoring unknown storage backend {:?}", other),
            }
        }
        if let Some(val) = var("ZD_CONF_STORAGE_LOCAL_PATH") {
            self.storage.local_path = val;
        }

        // Session overrides
        if let Some(val) = var("ZD_CONF_SESSION_COOKIE_SECURE") {
            if let Ok(v) = val.parse() {
                self.session.cookie_secure = v;
            }
        }
        if let Some(val) = var("ZD_CONF_SESSION_CSRF_ENABLED") {
            if let Ok(v) = val.parse() {
                self.session.csrf_enabled = v;
            }
        }

        // Upstream services
        if let Some(val) = first(&["ZD_CONF_GITHUB_API_URL", "GITHUB_API_URL"]) {
            self.github.api_url = val.trim_end_matches('/').to_string();
        }
        if let Some(val) = first(&["ZD_CONF_VERCEL_API_URL", "VERCEL_API_URL"]) {
            self.vercel.api_url = val.trim_end_matches('/').to_string();
        }
        if let Some(val) = first(&["ZD_CONF_VERCEL_TOKEN", "VERCEL_TOKEN"]) {
            if !val.trim().is_empty() {
                self.vercel.token = Some(val);
            }
        }
        if let Some(val) = first(&["ZD_CONF_VERCEL_TEAM_ID", "VERCEL_ORG_ID"]) {
            if !val.trim().is_empty() {
                self.vercel.team_id = Some(val);
            }
        }
        if let Some(val) = first(&["ZD_CONF_NOTIFY_WEBHOOK_URL", "SLACK_WEBHOOK_URL"]) {
            if !val.trim().is_empty() {
                self.notify.webhook_url = Some(val);
            }
        }
    }

    /// Ensure required directories exist
    fn ensure_directories(&self) -> anyhow::Result<()> {
        if self.storage.backend == StorageBackend::Local {
            fs::create_dir_all(&self.storage.local_path)?;
        }
        Ok(())
    }
}
