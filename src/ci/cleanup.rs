use crate::domain::dev_branch_glob;
use crate::error::Result;
use crate::git::{GitQuery, GitRunner};
use crate::github::GitHubApi;
use crate::ui;
use crate::workspace::Workspace;

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupArgs {
    pub pull_number: u64,
}

/// What happened to each dev branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    /// Listed by git but already gone on GitHub
    pub already_clean: Vec<String>,
    pub failed: Vec<String>,
}

/// `cleanup`: delete every dev branch of a closed pull request.
///
/// A failure on one branch is logged and does not stop the others.
pub fn cleanup(
    ws: &Workspace,
    runner: &dyn GitRunner,
    git: &dyn GitQuery,
    github: &dyn GitHubApi,
    args: &CleanupArgs,
) -> Result<CleanupReport> {
    runner.fetch(ws.root(), &ws.config().release.remote)?;

    let branches = git.remote_branches_matching(&dev_branch_glob(args.pull_number))?;
    tracing::info!(?branches, "found remote dev branches");

    let mut report = CleanupReport::default();
    for branch in branches {
        let git_ref = format!("heads/{}", branch);
        let result = github.get_ref(&git_ref).and_then(|found| match found {
            Some(_) => github.delete_ref(&git_ref).map(|_| true),
            None => Ok(false),
        });

        match result {
            Ok(true) => {
                ui::display_success(&format!("Deleted dev branch {}", branch));
                report.deleted.push(branch);
            }
            Ok(false) => {
                tracing::info!(branch = %branch, "branch not found, already clean");
                report.already_clean.push(branch);
            }
            Err(e) => {
                tracing::error!(branch = %branch, error = %e, "failed to delete dev branch");
                ui::display_error(&format!("Failed to delete dev branch {}: {}", branch, e));
                report.failed.push(branch);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::MockRepository;
    use crate::github::MockGitHub;
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct NoopRunner {
        calls: RefCell<Vec<String>>,
    }

    impl GitRunner for NoopRunner {
        fn run(&self, _cwd: &Path, args: &[&str]) -> Result<String> {
            self.calls.borrow_mut().push(args.join(" "));
            Ok(String::new())
        }
    }

    #[test]
    fn test_cleanup_deletes_only_this_pull_request() {
        let ws = Workspace::new("/repo", Config::default());
        let runner = NoopRunner::default();
        let git = MockRepository::new()
            .with_remote_branch("foo/dev-pr-7")
            .with_remote_branch("workflow-a/dev-pr-7")
            .with_remote_branch("foo/dev-pr-70")
            .with_remote_branch("foo/v1");
        let github = MockGitHub::new()
            .with_ref("heads/foo/dev-pr-7", "abc")
            .with_ref("heads/workflow-a/dev-pr-7", "def");

        let report = cleanup(&ws, &runner, &git, &github, &CleanupArgs { pull_number: 7 }).unwrap();

        assert_eq!(report.deleted, vec!["foo/dev-pr-7", "workflow-a/dev-pr-7"]);
        assert!(report.already_clean.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(
            github.deleted_refs(),
            vec!["heads/foo/dev-pr-7", "heads/workflow-a/dev-pr-7"]
        );
        assert_eq!(runner.calls.borrow().as_slice(), ["fetch origin"]);
    }

    #[test]
    fn test_cleanup_continues_after_failure() {
        let ws = Workspace::new("/repo", Config::default());
        let git = MockRepository::new()
            .with_remote_branch("a/dev-pr-1")
            .with_remote_branch("b/dev-pr-1")
            .with_remote_branch("c/dev-pr-1");
        let github = MockGitHub::new()
            .with_undeletable_ref("heads/a/dev-pr-1")
            .with_ref("heads/c/dev-pr-1", "def");

        let report = cleanup(
            &ws,
            &NoopRunner::default(),
            &git,
            &github,
            &CleanupArgs { pull_number: 1 },
        )
        .unwrap();

        assert_eq!(report.failed, vec!["a/dev-pr-1"]);
        assert_eq!(report.already_clean, vec!["b/dev-pr-1"]);
        assert_eq!(report.deleted, vec!["c/dev-pr-1"]);
    }

    #[test]
    fn test_cleanup_without_branches() {
        let ws = Workspace::new("/repo", Config::default());
        let report = cleanup(
            &ws,
            &NoopRunner::default(),
            &MockRepository::new(),
            &MockGitHub::new(),
            &CleanupArgs { pull_number: 3 },
        )
        .unwrap();
        assert_eq!(report, CleanupReport::default());
    }
}
