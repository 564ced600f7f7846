//! Deployment audit log
//!
//! Every step of a webhook request is appended to a plain-text file as
//! `[YYYY-MM-DD HH:MM:SS] message`. Writing never fails from the caller's
//! point of view: a full disk must not turn a good deployment into an error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::filesys::file::File;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only deployment log shared by all requests
#[derive(Debug)]
pub struct DeployJournal {
    file: File,
    // Serializes appends so entries from concurrent requests never interleave.
    lock: Mutex<()>,
}

impl DeployJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: File::new(path),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Record an informational entry
    pub async fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(target: "pushdeploy::journal", "{}", message);
        self.append(message).await;
    }

    /// Record an entry prefixed with `WARNING:`
    pub async fn warn(&self, message: impl AsRef<str>) {
        let message = format!("WARNING: {}", message.as_ref());
        warn!(target: "pushdeploy::journal", "{}", message);
        self.append(&message).await;
    }

    /// Record an entry prefixed with `ERROR:`
    pub async fn error(&self, message: impl AsRef<str>) {
        let message = format!("ERROR: {}", message.as_ref());
        error!(target: "pushdeploy::journal", "{}", message);
        self.append(&message).await;
    }

    async fn append(&self, message: &str) {
        let _guard = self.lock.lock().await;
        let line = format_entry(Local::now(), message);
        if let Err(e) = self.file.append(line.as_bytes()).await {
            warn!(
                "Unable to write deployment log {}: {}",
                self.file.path().display(),
                e
            );
        }
    }
}

/// Format one log entry, including the trailing newline
pub fn format_entry(timestamp: DateTime<Local>, message: &str) -> String {
    format!("[{}] {}\n", timestamp.format(TIMESTAMP_FORMAT), message)
}
