//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// Where the agent looks for its files when no explicit path is given
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        // Use /etc/pushdeploy on Linux, or user home directory on other platforms
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/etc/pushdeploy");

        #[cfg(not(target_os = "linux"))]
        let base_dir = home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".pushdeploy");

        Self::new(base_dir)
    }
}

#[cfg(not(target_os = "linux"))]
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}
