use crate::error::{CiError, Result};
use crate::git::{parse_name_status, DiffRecord, GitQuery, GitRunner};
use std::path::{Path, PathBuf};

/// [GitQuery] over the git command line
pub struct CliRepository<R: GitRunner> {
    runner: R,
    root: PathBuf,
    remote: String,
}

impl<R: GitRunner> CliRepository<R> {
    pub fn new(runner: R, root: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        CliRepository {
            runner,
            root: root.into(),
            remote: remote.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

/// git reports "no names found" style failures when a lineage has no tags.
fn is_no_tags_failure(err: &CiError) -> bool {
    match err {
        CiError::GitCommand { stderr, .. } => {
            let stderr = stderr.to_lowercase();
            stderr.contains("no names found") || stderr.contains("no tags")
        }
        _ => false,
    }
}

fn non_empty_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().map(str::trim).filter(|l| !l.is_empty())
}

impl<R: GitRunner> GitQuery for CliRepository<R> {
    fn diff_since(&self, base: &str) -> Result<Vec<DiffRecord>> {
        let output = self
            .runner
            .run(&self.root, &["diff", "--name-status", base])?;
        Ok(parse_name_status(&output))
    }

    fn tags_matching(&self, glob: &str) -> Result<Vec<String>> {
        match self.runner.run(&self.root, &["tag", "-l", glob]) {
            Ok(output) => Ok(non_empty_lines(&output).map(str::to_string).collect()),
            Err(e) if is_no_tags_failure(&e) => {
                tracing::debug!(glob, "no tags found");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>> {
        let pattern = format!("{}/{}", self.remote, glob);
        let output = self
            .runner
            .run(&self.root, &["branch", "-r", "-l", &pattern])?;
        let prefix = format!("{}/", self.remote);

        Ok(non_empty_lines(&output)
            .filter(|line| !line.contains(" -> "))
            .map(|line| line.strip_prefix(&prefix).unwrap_or(line).to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Returns a fixed response and records the arguments it was called with.
    struct ScriptedRunner {
        response: std::result::Result<String, (i32, String)>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        fn ok(stdout: &str) -> Self {
            ScriptedRunner {
                response: Ok(stdout.to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(code: i32, stderr: &str) -> Self {
            ScriptedRunner {
                response: Err((code, stderr.to_string())),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl GitRunner for ScriptedRunner {
        fn run(&self, _cwd: &Path, args: &[&str]) -> Result<String> {
            self.calls.borrow_mut().push(args.join(" "));
            match &self.response {
                Ok(stdout) => Ok(stdout.clone()),
                Err((code, stderr)) => Err(CiError::GitCommand {
                    args: args.join(" "),
                    code: *code,
                    stderr: stderr.clone(),
                }),
            }
        }
    }

    #[test]
    fn test_diff_since_invokes_name_status() {
        let repo = CliRepository::new(ScriptedRunner::ok("M\ta.txt\n"), "/repo", "origin");
        let records = repo.diff_since("abc123").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            repo.runner().calls.borrow().as_slice(),
            ["diff --name-status abc123"]
        );
    }

    #[test]
    fn test_tags_matching() {
        let repo = CliRepository::new(
            ScriptedRunner::ok("foo/v1.0.0\nfoo/v1.1.0\n\n"),
            "/repo",
            "origin",
        );
        assert_eq!(
            repo.tags_matching("foo/v*").unwrap(),
            vec!["foo/v1.0.0".to_string(), "foo/v1.1.0".to_string()]
        );
        assert_eq!(repo.runner().calls.borrow()[0], "tag -l foo/v*");
    }

    #[test]
    fn test_tags_no_names_found_is_empty() {
        let repo = CliRepository::new(
            ScriptedRunner::failing(128, "fatal: No names found, cannot describe anything."),
            "/repo",
            "origin",
        );
        assert!(repo.tags_matching("foo/v*").unwrap().is_empty());
    }

    #[test]
    fn test_tags_other_failures_propagate() {
        let repo = CliRepository::new(
            ScriptedRunner::failing(128, "fatal: not a git repository"),
            "/repo",
            "origin",
        );
        assert!(matches!(
            repo.tags_matching("foo/v*"),
            Err(CiError::GitCommand { code: 128, .. })
        ));
    }

    #[test]
    fn test_remote_branches_strip_remote() {
        let repo = CliRepository::new(
            ScriptedRunner::ok("  origin/foo/v1\n  origin/foo/v2\n  origin/HEAD -> origin/main\n"),
            "/repo",
            "origin",
        );
        assert_eq!(
            repo.remote_branches_matching("foo/v*").unwrap(),
            vec!["foo/v1".to_string(), "foo/v2".to_string()]
        );
        assert_eq!(repo.runner().calls.borrow()[0], "branch -r -l origin/foo/v*");
    }
}
