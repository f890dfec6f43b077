use crate::domain::{
    bump_version, latest_tagged_version, resolve_release_label, BuildUnit, PrereleaseChannel,
    ReleaseLabel, TagPrefix, VersionLabel, VersionRef, BASELINE_VERSION,
};
use crate::error::{CiError, Result};
use crate::git::{GitQuery, GitRunner};
use crate::github::GitHubApi;
use crate::outputs::Outputs;
use crate::release::{stage_contents, PublishOutcome, Publisher, ReleaseRequest};
use crate::ui;
use crate::workspace::Workspace;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseLabelArgs {
    pub pull_number: u64,
    /// A pull request without any release label is not an error
    pub tolerate_missing: bool,
}

/// `release-label`: the release decision of a pull request.
///
/// Outputs `release-label` (empty unless a release is requested) and
/// `continue-release`.
pub fn release_label(
    github: &dyn GitHubApi,
    args: &ReleaseLabelArgs,
    outputs: &Outputs,
) -> Result<Option<ReleaseLabel>> {
    let labels = github.pull_request_labels(args.pull_number)?;
    tracing::debug!(?labels, pull_number = args.pull_number, "pull request labels");
    let label = resolve_release_label(&labels, args.tolerate_missing)?;

    match label.and_then(|l| l.version_label()) {
        Some(version_label) => {
            ui::display_success(&format!("Release label: {}", version_label));
            outputs.set("release-label", version_label)?;
            outputs.set("continue-release", true)?;
        }
        None => {
            ui::display_status("No release requested");
            outputs.set("release-label", "")?;
            outputs.set("continue-release", false)?;
        }
    }
    Ok(label)
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionArgs {
    pub unit: String,
    pub release_label: VersionLabel,
    pub prerelease: Option<String>,
    pub force_prerelease: bool,
}

/// `version`: next version of a unit, without publishing anything.
pub fn version(
    ws: &Workspace,
    runner: &dyn GitRunner,
    git: &dyn GitQuery,
    args: &VersionArgs,
    outputs: &Outputs,
) -> Result<VersionRef> {
    let channel = args
        .prerelease
        .as_deref()
        .map(str::parse::<PrereleaseChannel>)
        .transpose()?;

    runner.fetch_tags(ws.root())?;
    let prefix = TagPrefix::for_unit(&args.unit);
    let tags = git.tags_matching(&prefix.glob())?;
    let previous = latest_tagged_version(&tags, &prefix);
    let current = previous.clone().unwrap_or(BASELINE_VERSION);
    let next = bump_version(
        &current,
        args.release_label,
        channel.as_ref(),
        args.force_prerelease,
    )?;
    let refs = VersionRef::for_version(&args.unit, next);

    ui::display_version_ref(&args.unit, previous.as_ref(), &refs);

    outputs.set("version", &refs.new_version)?;
    outputs.set("version-branch", &refs.version_branch)?;
    outputs.set("version-tag", &refs.new_tag)?;
    Ok(refs)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishArgs {
    pub unit: BuildUnit,
    /// Prebuilt contents to publish instead of the default staging
    pub contents: Option<PathBuf>,
    pub release: bool,
    pub release_label: Option<ReleaseLabel>,
    pub pull_number: Option<u64>,
    pub prerelease: Option<String>,
}

impl PublishArgs {
    /// Turn the arguments into a request, rejecting incomplete ones.
    pub fn request(&self) -> Result<ReleaseRequest> {
        let unit = self.unit.clone();
        if !self.release {
            let pull_number = self.pull_number.ok_or_else(|| {
                CiError::validation("a pull request number is required for dev builds")
            })?;
            return Ok(ReleaseRequest::Dev { unit, pull_number });
        }

        let label = match self.release_label {
            Some(ReleaseLabel::Release(label)) => label,
            Some(ReleaseLabel::NoRelease) => {
                return Err(CiError::validation(format!(
                    "cannot release {} with the no-release label",
                    unit.name
                )))
            }
            None => {
                return Err(CiError::validation(
                    "a release label is required for releases",
                ))
            }
        };
        let prerelease = self
            .prerelease
            .as_deref()
            .map(str::parse::<PrereleaseChannel>)
            .transpose()?;
        Ok(ReleaseRequest::Release {
            unit,
            label,
            prerelease,
        })
    }
}

/// `publish`: stage a unit and push it to its dev or version branch.
pub fn publish(
    ws: &Workspace,
    runner: &dyn GitRunner,
    git: &dyn GitQuery,
    args: &PublishArgs,
    outputs: &Outputs,
) -> Result<PublishOutcome> {
    let request = args.request()?;
    if args.contents.is_none() && !ws.unit_exists(&args.unit) {
        return Err(CiError::validation(format!("{} does not exist", args.unit)));
    }

    let staged = stage_contents(ws, &args.unit, args.contents.as_deref())?;
    let publisher = Publisher::new(runner, git, ws.root(), &ws.config().release);
    let outcome = publisher.publish(&request, staged.path())?;

    match &outcome.tag {
        Some(tag) => ui::display_success(&format!("Published {} on {}", tag, outcome.branch)),
        None => ui::display_success(&format!("Published {}", outcome.branch)),
    }

    outputs.set("version-branch", &outcome.branch)?;
    if let Some(tag) = &outcome.tag {
        outputs.set("version-tag", tag)?;
    }
    Ok(outcome)
}
