//! Type-safe git command builder for consistent subprocess execution.
//!
//! Every git invocation in unitver goes through [`GitCommand`] so that
//! working-directory handling, timeouts, logging, and error mapping behave
//! identically everywhere. Each call runs one git subprocess to completion;
//! nothing here spawns background work.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::UnitverError;

/// Name of the git executable for the current platform.
pub fn git_program() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Verify that git is installed and reachable through PATH.
///
/// Called once at CLI startup before any repository work.
pub fn ensure_git_available() -> Result<()> {
    which::which(git_program()).map_err(|_| UnitverError::GitNotFound)?;
    Ok(())
}

/// Builder for constructing and executing git commands.
///
/// Defaults: output captured, 60-second timeout, repository selected via
/// `git -C <dir>` so execution is independent of the process working
/// directory.
///
/// ```rust,ignore
/// let sha = GitCommand::new()
///     .args(["rev-parse", "--verify", "main^{commit}"])
///     .current_dir(&unit_location)
///     .execute_stdout()
///     .await?;
/// ```
pub struct GitCommand {
    /// Arguments passed to git (e.g. `["rev-parse", "HEAD"]`).
    args: Vec<String>,
    /// Repository directory, passed as `git -C <dir>`.
    current_dir: Option<std::path::PathBuf>,
    /// Maximum duration to wait for completion.
    timeout_duration: Option<Duration>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Local-only plumbing commands; a minute is generous.
            timeout_duration: Some(Duration::from_secs(60)),
        }
    }
}

impl GitCommand {
    /// Create a new git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the repository directory the command runs against.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Override the default timeout (`None` disables it).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// The git subcommand name, for error payloads.
    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Execute the command and return its raw output.
    ///
    /// A non-zero exit status maps to [`UnitverError::GitCommandError`] with
    /// the captured stderr; a timeout maps to [`UnitverError::GitTimeout`].
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let operation = self.operation();
        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            // -C keeps git operations independent of the process cwd and
            // avoids symlink resolution surprises from chdir.
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args);

        tracing::debug!(target: "git", "Executing: {} {}", git_program(), full_args.join(" "));

        let mut cmd = Command::new(git_program());
        cmd.args(&full_args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result
                    .with_context(|| format!("failed to execute git {}", full_args.join(" ")))?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {}s: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(UnitverError::GitTimeout {
                        operation,
                        seconds: duration.as_secs(),
                    }
                    .into());
                }
            }
        } else {
            output_future
                .await
                .with_context(|| format!("failed to execute git {}", full_args.join(" ")))?
        };

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "git {} exited with {:?}: {}",
                operation,
                output.status.code(),
                stderr.trim()
            );
            return Err(UnitverError::GitCommandError {
                operation,
                stderr: (!stderr.is_empty()).then(|| stderr.trim().to_string()),
            }
            .into());
        }

        Ok(GitCommandOutput {
            stdout: output.stdout,
            stderr,
        })
    }

    /// Execute and return stdout as a trimmed UTF-8 string.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Execute and discard output, keeping only success/failure.
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }

    /// Execute and report whether the command succeeded.
    ///
    /// Used for existence probes (`rev-parse --verify`) where a failing exit
    /// status is an answer, not an error.
    pub async fn succeeds(self) -> bool {
        self.execute().await.is_ok()
    }
}

/// Raw output from a git command.
#[derive(Debug)]
pub struct GitCommandOutput {
    /// Standard output bytes. Kept raw because `git archive` emits a binary
    /// tar stream.
    pub stdout: Vec<u8>,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_name_from_first_arg() {
        let cmd = GitCommand::new().args(["rev-parse", "--verify", "main"]);
        assert_eq!(cmd.operation(), "rev-parse");
        assert_eq!(GitCommand::new().operation(), "unknown");
    }

    #[tokio::test]
    async fn version_probe_succeeds() {
        // Requires git on PATH, as all integration paths do.
        let out = GitCommand::new().arg("--version").execute_stdout().await.unwrap();
        assert!(out.starts_with("git version"));
    }

    #[tokio::test]
    async fn bogus_subcommand_maps_to_typed_error() {
        let err = GitCommand::new()
            .arg("definitely-not-a-subcommand")
            .execute()
            .await
            .unwrap_err();
        let git_err = err.downcast_ref::<UnitverError>().unwrap();
        assert!(matches!(git_err, UnitverError::GitCommandError { .. }));
    }
}
