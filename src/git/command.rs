use crate::error::{CiError, Result};
use std::path::Path;
use std::process::Command;

/// Synchronous git command executor.
///
/// `run` returns stdout of a successful invocation. Any non-zero exit is a
/// [CiError::GitCommand]; there are no retries.
pub trait GitRunner {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String>;

    /// `git fetch <remote>`
    fn fetch(&self, cwd: &Path, remote: &str) -> Result<()> {
        self.run(cwd, &["fetch", remote]).map(|_| ())
    }

    /// `git fetch --tags`
    fn fetch_tags(&self, cwd: &Path) -> Result<()> {
        self.run(cwd, &["fetch", "--tags"]).map(|_| ())
    }
}

impl<R: GitRunner + ?Sized> GitRunner for &R {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        (**self).run(cwd, args)
    }
}

/// Runs the git executable as a child process
#[derive(Debug, Clone)]
pub struct SystemGit {
    executable: String,
}

impl SystemGit {
    pub fn new(executable: impl Into<String>) -> Self {
        SystemGit {
            executable: executable.into(),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner for SystemGit {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        tracing::debug!(cwd = %cwd.display(), "git {}", joined);

        let output = Command::new(&self.executable)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| {
                CiError::config(format!(
                    "Failed to execute '{}': {}",
                    self.executable, e
                ))
            })?;

        if !output.status.success() {
            return Err(CiError::GitCommand {
                args: joined,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_reported() {
        let git = SystemGit::new("definitely-not-a-git-binary");
        let err = git.run(Path::new("."), &["status"]).unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-git-binary"));
    }

    #[test]
    fn test_failed_command_carries_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let git = SystemGit::default();
        // Not a repository: git exits non-zero
        match git.run(dir.path(), &["rev-parse", "--verify", "HEAD"]) {
            Err(CiError::GitCommand { args, code, .. }) => {
                assert_eq!(args, "rev-parse --verify HEAD");
                assert_ne!(code, 0);
            }
            // git not installed on this machine
            Err(CiError::Config(_)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
