// tests/publish_test.rs
use gha_ci::ci::{publish, PublishArgs};
use gha_ci::config::Config;
use gha_ci::domain::{BuildUnit, ReleaseLabel, VersionLabel};
use gha_ci::error::{CiError, Result};
use gha_ci::git::{GitRunner, MockRepository};
use gha_ci::outputs::Outputs;
use gha_ci::workspace::Workspace;
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Records every git invocation. Fetching a branch fails unless the branch
/// is listed in `remote_branches`.
#[derive(Default)]
struct RecordingRunner {
    calls: RefCell<Vec<String>>,
    remote_branches: Vec<String>,
    /// Files present in the clone when `git add` ran
    staged: RefCell<Vec<String>>,
}

impl GitRunner for RecordingRunner {
    fn run(&self, cwd: &Path, args: &[&str]) -> Result<String> {
        let joined = args.join(" ");
        self.calls.borrow_mut().push(joined.clone());

        if args.first() == Some(&"fetch") && args.len() == 3 {
            let branch = args[2].split(':').next().unwrap_or_default();
            if !self.remote_branches.iter().any(|b| b == branch) {
                return Err(CiError::GitCommand {
                    args: joined,
                    code: 128,
                    stderr: format!("fatal: couldn't find remote ref {}", branch),
                });
            }
        }
        if args.first() == Some(&"add") {
            let mut files: Vec<String> = walkdir::WalkDir::new(cwd)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| {
                    let rel = e.path().strip_prefix(cwd).ok()?.to_string_lossy().into_owned();
                    (!rel.starts_with(".git/")).then_some(rel)
                })
                .collect();
            files.sort();
            *self.staged.borrow_mut() = files;
        }
        Ok(String::new())
    }
}

fn touch(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn checkout() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, ".git/HEAD", "ref: refs/heads/main\n");
    touch(root, "actions/foo/action.yml", "name: foo\nruns:\n  using: node20\n  main: dist/index.js\n");
    touch(root, "actions/foo/dist/index.js", "console.log(1)\n");
    touch(root, "actions/foo/src/index.ts", "console.log(1)\n");
    dir
}

fn dev_args(pull_number: Option<u64>) -> PublishArgs {
    PublishArgs {
        unit: BuildUnit::action("foo").unwrap(),
        contents: None,
        release: false,
        release_label: None,
        pull_number,
        prerelease: None,
    }
}

#[test]
fn test_dev_publish_creates_and_force_pushes_branch() {
    let dir = checkout();
    let ws = Workspace::new(dir.path(), Config::default());
    let runner = RecordingRunner::default();
    let outputs = Outputs::memory();

    let outcome = publish(&ws, &runner, &MockRepository::new(), &dev_args(Some(3)), &outputs).unwrap();

    assert_eq!(outcome.branch, "foo/dev-pr-3");
    assert_eq!(outcome.tag, None);
    let calls = runner.calls.borrow();
    assert_eq!(calls[0], "fetch origin foo/dev-pr-3:foo/dev-pr-3");
    assert_eq!(calls[1], "checkout -B foo/dev-pr-3");
    assert_eq!(calls[2], "add .");
    assert!(calls[3].starts_with("commit -m [foo/dev-pr-3] "));
    assert_eq!(calls[4], "push --force origin foo/dev-pr-3");
    assert_eq!(calls.len(), 5);

    assert_eq!(
        runner.staged.borrow().as_slice(),
        [".timestamp", "action.yml", "dist/index.js"]
    );
    assert_eq!(outputs.get("version-branch").unwrap(), "foo/dev-pr-3");
    assert_eq!(outputs.get("version-tag"), None);
}

#[test]
fn test_release_commits_on_existing_version_branch() {
    let dir = checkout();
    let ws = Workspace::new(dir.path(), Config::default());
    let runner = RecordingRunner {
        remote_branches: vec!["foo/v1".to_string()],
        ..Default::default()
    };
    let git = MockRepository::new()
        .with_tag("foo/v1.0.0")
        .with_tag("foo/v1.1.0")
        .with_remote_branch("foo/v1");
    let outputs = Outputs::memory();
    let args = PublishArgs {
        release: true,
        release_label: Some(ReleaseLabel::Release(VersionLabel::Patch)),
        ..dev_args(None)
    };

    let outcome = publish(&ws, &runner, &git, &args, &outputs).unwrap();

    assert_eq!(outcome.branch, "foo/v1");
    assert_eq!(outcome.tag.as_deref(), Some("foo/v1.1.1"));
    assert_eq!(
        runner.calls.borrow().as_slice(),
        [
            "fetch --tags",
            "fetch origin foo/v1:foo/v1",
            "checkout foo/v1",
            "add .",
            "commit -m [foo/v1] foo/v1.1.1",
            "tag foo/v1.1.1",
            "push origin foo/v1",
            "push origin tag foo/v1.1.1",
        ]
    );
    assert_eq!(outputs.get("version-tag").unwrap(), "foo/v1.1.1");
}

#[test]
fn test_first_major_release_starts_new_branch() {
    let dir = checkout();
    let ws = Workspace::new(dir.path(), Config::default());
    let runner = RecordingRunner::default();
    let git = MockRepository::new().with_tag("foo/v1.4.2");
    let args = PublishArgs {
        release: true,
        release_label: Some(ReleaseLabel::Release(VersionLabel::Major)),
        ..dev_args(None)
    };

    let outcome = publish(&ws, &runner, &git, &args, &Outputs::memory()).unwrap();
    assert_eq!(outcome.branch, "foo/v2");
    assert_eq!(outcome.tag.as_deref(), Some("foo/v2.0.0"));
    assert!(runner
        .calls
        .borrow()
        .contains(&"checkout -B foo/v2".to_string()));
}

#[test]
fn test_prebuilt_contents_replace_default_selection() {
    let dir = checkout();
    let prebuilt = tempfile::tempdir().unwrap();
    touch(prebuilt.path(), "action.yml", "name: foo\n");
    touch(prebuilt.path(), "bundle/main.js", "x\n");

    let ws = Workspace::new(dir.path(), Config::default());
    let runner = RecordingRunner::default();
    let args = PublishArgs {
        contents: Some(prebuilt.path().to_path_buf()),
        ..dev_args(Some(8))
    };

    publish(&ws, &runner, &MockRepository::new(), &args, &Outputs::memory()).unwrap();
    assert_eq!(
        runner.staged.borrow().as_slice(),
        [".timestamp", "action.yml", "bundle/main.js"]
    );
}

#[test]
fn test_invalid_requests_do_not_touch_git() {
    let dir = checkout();
    let ws = Workspace::new(dir.path(), Config::default());
    let runner = RecordingRunner::default();

    let missing_pull = publish(&ws, &runner, &MockRepository::new(), &dev_args(None), &Outputs::memory());
    assert!(matches!(missing_pull, Err(CiError::Validation(_))));

    let no_release = PublishArgs {
        release: true,
        release_label: Some(ReleaseLabel::NoRelease),
        ..dev_args(None)
    };
    assert!(publish(&ws, &runner, &MockRepository::new(), &no_release, &Outputs::memory()).is_err());

    let unknown = PublishArgs {
        unit: BuildUnit::action("ghost").unwrap(),
        ..dev_args(Some(1))
    };
    assert!(publish(&ws, &runner, &MockRepository::new(), &unknown, &Outputs::memory()).is_err());

    assert!(runner.calls.borrow().is_empty());
}
