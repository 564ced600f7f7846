//! External command execution

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Outcome of one external command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// stdout and stderr, interleaved as the process wrote them
    pub combined_output: String,

    /// The process exited with status 0
    pub succeeded: bool,
}

impl CommandResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            combined_output: output.into(),
            succeeded: true,
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            combined_output: output.into(),
            succeeded: false,
        }
    }
}

/// Runs a git subcommand in a working tree.
///
/// Implementations never fail outright: a process that cannot be started or
/// does not finish in time yields an unsuccessful [`CommandResult`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, working_dir: &Path, args: &[String]) -> CommandResult;
}

/// Runs the `git` executable as a child process
#[derive(Debug, Clone)]
pub struct GitCommandRunner {
    program: PathBuf,
    timeout: Duration,
}

impl GitCommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
        }
    }

    /// Use a different git executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl CommandRunner for GitCommandRunner {
    async fn run(&self, working_dir: &Path, args: &[String]) -> CommandResult {
        debug!("Running {} {:?} in {}", self.program.display(), args, working_dir.display());

        // The shell only merges stderr into stdout; arguments are passed
        // positionally and never interpolated.
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"exec "$@" 2>&1"#)
            .arg("pushdeploy")
            .arg(&self.program)
            .args(args)
            .current_dir(working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => CommandResult {
                combined_output: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
                succeeded: output.status.success(),
            },
            Ok(Err(e)) => CommandResult::failure(format!(
                "failed to run {}: {}",
                self.program.display(),
                e
            )),
            Err(_) => CommandResult::failure(format!(
                "{} {} timed out after {}s",
                self.program.display(),
                args.first().map(String::as_str).unwrap_or_default(),
                self.timeout.as_secs()
            )),
        }
    }
}
