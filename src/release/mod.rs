//! Publishing a unit to its dev branch or to a version branch and tag.
//!
//! Both paths commit on top of the remote branch when it exists, so
//! version branches keep their history. A marker file is rewritten before
//! every commit, which keeps the commit non-empty when contents are
//! unchanged.
//!
//! Dev branches are force-pushed: concurrent builds of the same pull
//! request are at-least-once, the last push wins.

pub mod stage;

pub use stage::{copy_tree, stage_contents};

use crate::config::ReleaseConfig;
use crate::domain::{
    bump_version, dev_branch_name, latest_version, BuildUnit, PrereleaseChannel, TagPrefix,
    VersionLabel, VersionRef,
};
use crate::error::{CiError, Result};
use crate::git::{GitQuery, GitRunner};
use chrono::{SecondsFormat, Utc};
use semver::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// What to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRequest {
    /// Per pull request dev branch, no tag
    Dev { unit: BuildUnit, pull_number: u64 },
    /// Next version of the unit: version branch plus tag
    Release {
        unit: BuildUnit,
        label: VersionLabel,
        prerelease: Option<PrereleaseChannel>,
    },
}

impl ReleaseRequest {
    pub fn unit(&self) -> &BuildUnit {
        match self {
            ReleaseRequest::Dev { unit, .. } => unit,
            ReleaseRequest::Release { unit, .. } => unit,
        }
    }

    pub fn is_release(&self) -> bool {
        matches!(self, ReleaseRequest::Release { .. })
    }
}

/// Refs and commit message of one publish, computed before any mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishPlan {
    pub branch: String,
    pub tag: Option<String>,
    pub version: Option<Version>,
    pub commit_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub branch: String,
    pub tag: Option<String>,
    pub version: Option<Version>,
}

pub struct Publisher<R: GitRunner, Q: GitQuery> {
    runner: R,
    git: Q,
    root: PathBuf,
    remote: String,
    marker_file: String,
}

impl<R: GitRunner, Q: GitQuery> Publisher<R, Q> {
    pub fn new(runner: R, git: Q, root: impl Into<PathBuf>, config: &ReleaseConfig) -> Self {
        Publisher {
            runner,
            git,
            root: root.into(),
            remote: config.remote.clone(),
            marker_file: config.marker_file.clone(),
        }
    }

    /// Resolve branch, tag and version. Release plans fetch tags first.
    pub fn plan(&self, request: &ReleaseRequest) -> Result<PublishPlan> {
        match request {
            ReleaseRequest::Dev { unit, pull_number } => {
                let branch = dev_branch_name(&unit.name, *pull_number);
                let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                Ok(PublishPlan {
                    commit_message: format!("[{}] {}", branch, timestamp),
                    branch,
                    tag: None,
                    version: None,
                })
            }
            ReleaseRequest::Release {
                unit,
                label,
                prerelease,
            } => {
                self.runner.fetch_tags(&self.root)?;
                let prefix = TagPrefix::for_unit(&unit.name);
                let tags = self.git.tags_matching(&prefix.glob())?;
                let latest = latest_version(&tags, &prefix);
                let next = bump_version(&latest, *label, prerelease.as_ref(), false)?;
                tracing::info!(unit = %unit.name, %latest, %next, "resolved next version");

                let refs = VersionRef::for_version(&unit.name, next);
                Ok(PublishPlan {
                    commit_message: format!("[{}] {}", refs.version_branch, refs.new_tag),
                    branch: refs.version_branch,
                    tag: Some(refs.new_tag),
                    version: Some(refs.new_version),
                })
            }
        }
    }

    /// Publish `contents_dir` for `request` and push the result.
    pub fn publish(&self, request: &ReleaseRequest, contents_dir: &Path) -> Result<PublishOutcome> {
        let plan = self.plan(request)?;
        tracing::info!(
            branch = %plan.branch,
            tag = plan.tag.as_deref().unwrap_or("-"),
            "publishing"
        );

        let clone = self.commit_in_clone(&plan, contents_dir)?;
        let cwd = clone.path();

        if request.is_release() {
            self.runner.run(cwd, &["push", &self.remote, &plan.branch])?;
        } else {
            self.runner
                .run(cwd, &["push", "--force", &self.remote, &plan.branch])?;
        }
        if let Some(tag) = &plan.tag {
            self.runner.run(cwd, &["push", &self.remote, "tag", tag])?;
        }

        Ok(PublishOutcome {
            branch: plan.branch,
            tag: plan.tag,
            version: plan.version,
        })
    }

    /// Private clone (a copy of `.git`) with `contents_dir` committed on
    /// the plan's branch.
    fn commit_in_clone(&self, plan: &PublishPlan, contents_dir: &Path) -> Result<TempDir> {
        let clone = tempfile::tempdir()?;
        let cwd = clone.path();
        let git_dir = self.root.join(".git");
        if !git_dir.exists() {
            return Err(CiError::config(format!(
                "{} is not a git checkout",
                self.root.display()
            )));
        }
        tracing::debug!(dir = %cwd.display(), "cloning repository metadata");
        copy_tree(&git_dir, &cwd.join(".git"))?;

        let branch = plan.branch.as_str();
        let refspec = format!("{}:{}", branch, branch);
        let restored = self
            .runner
            .run(cwd, &["fetch", &self.remote, &refspec])
            .and_then(|_| self.runner.run(cwd, &["checkout", branch]));
        if let Err(e) = restored {
            tracing::debug!(branch, error = %e, "no remote branch, creating it");
            self.runner.run(cwd, &["checkout", "-B", branch])?;
        }

        copy_tree(contents_dir, cwd)?;
        fs::write(
            cwd.join(&self.marker_file),
            Utc::now().timestamp_millis().to_string(),
        )?;

        self.runner.run(cwd, &["add", "."])?;
        self.runner
            .run(cwd, &["commit", "-m", &plan.commit_message])?;
        if let Some(tag) = &plan.tag {
            self.runner.run(cwd, &["tag", tag])?;
        }
        Ok(clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRunner {
        calls: RefCell<Vec<String>>,
    }

    impl GitRunner for RecordingRunner {
        fn run(&self, _cwd: &Path, args: &[&str]) -> Result<String> {
            self.calls.borrow_mut().push(args.join(" "));
            Ok(String::new())
        }
    }

    #[test]
    fn test_plan_dev() {
        let publisher = Publisher::new(
            RecordingRunner::default(),
            MockRepository::new(),
            "/repo",
            &ReleaseConfig::default(),
        );
        let plan = publisher
            .plan(&ReleaseRequest::Dev {
                unit: BuildUnit::action("foo").unwrap(),
                pull_number: 3,
            })
            .unwrap();
        assert_eq!(plan.branch, "foo/dev-pr-3");
        assert_eq!(plan.tag, None);
        assert!(plan.commit_message.starts_with("[foo/dev-pr-3] "));
    }

    #[test]
    fn test_plan_release_uses_latest_tag() {
        let git = MockRepository::new()
            .with_tag("foo/v1.2.0")
            .with_tag("foo/v1.10.0")
            .with_tag("foobar/v9.0.0");
        let publisher = Publisher::new(
            RecordingRunner::default(),
            git,
            "/repo",
            &ReleaseConfig::default(),
        );
        let plan = publisher
            .plan(&ReleaseRequest::Release {
                unit: BuildUnit::action("foo").unwrap(),
                label: VersionLabel::Minor,
                prerelease: None,
            })
            .unwrap();
        assert_eq!(plan.branch, "foo/v1");
        assert_eq!(plan.tag.as_deref(), Some("foo/v1.11.0"));
        assert_eq!(plan.commit_message, "[foo/v1] foo/v1.11.0");
        assert_eq!(
            publisher.runner.calls.borrow().as_slice(),
            ["fetch --tags"]
        );
    }
}
