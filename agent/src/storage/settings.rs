//! Settings file management

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::errors::AgentError;
use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Environment variable that replaces `deployment.secret`
pub const SECRET_ENV: &str = "PUSHDEPLOY_SECRET";

/// Environment variable that forces maintenance mode on
pub const MAINTENANCE_ENV: &str = "PUSHDEPLOY_MAINTENANCE";

/// Agent settings
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Directory for rotated diagnostic logs
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Emit diagnostic logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployment configuration
    pub deployment: DeploymentConfig,

    /// Deployment notifications
    #[serde(default)]
    pub notify: NotifySettings,
}

impl Settings {
    /// Read settings from a JSON file, apply environment overrides and validate.
    pub async fn load(file: &File) -> Result<Self, AgentError> {
        let mut settings = file.read_json::<Settings>().await.map_err(|e| {
            AgentError::ConfigError(format!(
                "unable to read settings file {}: {}",
                file.path().display(),
                e
            ))
        })?;
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    /// Apply `PUSHDEPLOY_*` overrides using the given variable lookup
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(secret) = lookup(SECRET_ENV).filter(|s| !s.is_empty()) {
            self.deployment.secret = SecretString::from(secret);
        }
        if let Some(flag) = lookup(MAINTENANCE_ENV) {
            if matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes" | "on") {
                self.deployment.maintenance_mode = true;
            }
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), AgentError> {
        self.deployment.validate()?;
        if !self.server.webhook_path.starts_with('/') {
            return Err(AgentError::ConfigError(format!(
                "server.webhook_path must start with '/': {}",
                self.server.webhook_path
            )));
        }
        if self.server.max_payload_bytes == 0 {
            return Err(AgentError::ConfigError(
                "server.max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Route that receives push notifications
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,

    /// Largest accepted notification body
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

/// 25 MiB, the largest push payload senders deliver
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 25 * 1024 * 1024;

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

/// Deployment configuration, immutable once loaded
#[derive(Debug, Deserialize)]
pub struct DeploymentConfig {
    /// Shared secret used to sign push notifications
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: SecretString,

    /// Working tree that is synchronized on every push
    pub repository_path: PathBuf,

    /// Branch whose pushes trigger a deployment
    #[serde(default = "default_branch")]
    pub target_branch: String,

    /// Remote the branch is fetched from
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Deployment audit log
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    /// Branches eligible for deployment; empty means no restriction
    #[serde(default)]
    pub allowed_branches: Vec<String>,

    /// Answer every push with a "disabled" response
    #[serde(default)]
    pub maintenance_mode: bool,

    /// Upper bound for each git invocation
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let secret = String::deserialize(deserializer)?;
    Ok(SecretString::from(secret))
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("deploy.log")
}

fn default_command_timeout() -> u64 {
    120
}

impl DeploymentConfig {
    /// Build a configuration with defaults for everything but the essentials
    pub fn new(
        secret: impl Into<String>,
        repository_path: impl Into<PathBuf>,
        target_branch: impl Into<String>,
    ) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            repository_path: repository_path.into(),
            target_branch: target_branch.into(),
            remote: default_remote(),
            log_file: default_log_file(),
            allowed_branches: Vec::new(),
            maintenance_mode: false,
            command_timeout_secs: default_command_timeout(),
        }
    }

    /// Timeout applied to each external command
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// The full ref a push must carry to trigger a deployment
    pub fn target_ref(&self) -> String {
        format!("refs/heads/{}", self.target_branch)
    }

    pub fn repository_path(&self) -> &Path {
        &self.repository_path
    }

    /// Validate the deployment configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.secret.expose_secret().is_empty() {
            return Err(AgentError::ConfigError(
                "deployment.secret must not be empty".to_string(),
            ));
        }
        if !self.repository_path.is_absolute() {
            return Err(AgentError::ConfigError(format!(
                "deployment.repository_path must be absolute: {}",
                self.repository_path.display()
            )));
        }
        if self.target_branch.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "deployment.target_branch must not be empty".to_string(),
            ));
        }
        if self.remote.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "deployment.remote must not be empty".to_string(),
            ));
        }
        if !self.allowed_branches.is_empty()
            && !self.allowed_branches.contains(&self.target_branch)
        {
            return Err(AgentError::ConfigError(format!(
                "deployment.target_branch '{}' is not in allowed_branches {:?}",
                self.target_branch, self.allowed_branches
            )));
        }
        if self.command_timeout_secs == 0 {
            return Err(AgentError::ConfigError(
                "deployment.command_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deployment notification settings
#[derive(Debug, Clone, Deserialize)]
pub struct NotifySettings {
    /// Recipient; notifications are disabled when empty
    #[serde(default)]
    pub email: String,

    /// Notify after a successful deployment
    #[serde(default = "default_true")]
    pub on_success: bool,

    /// Notify after a failed deployment
    #[serde(default = "default_true")]
    pub on_error: bool,

    /// SMTP relay host
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: Option<String>,

    #[serde(default)]
    pub smtp_password: Option<String>,

    /// Sender address
    #[serde(default = "default_from")]
    pub from: String,
}

fn default_true() -> bool {
    true
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from() -> String {
    "pushdeploy@localhost".to_string()
}

impl NotifySettings {
    pub fn is_enabled(&self) -> bool {
        !self.email.trim().is_empty() && self.smtp_host.is_some()
    }
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            email: String::new(),
            on_success: true,
            on_error: true,
            smtp_host: None,
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_password: None,
            from: default_from(),
        }
    }
}
