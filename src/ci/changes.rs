use crate::changes::{changed_directories, ChangedUnits};
use crate::ci::Matrix;
use crate::error::Result;
use crate::git::{GitQuery, GitRunner};
use crate::github::{CommentMarker, GitHubApi, Repo};
use crate::matcher::PathMatcher;
use crate::outputs::Outputs;
use crate::ui;
use crate::workspace::Workspace;

/// Tag of the changes summary comment on a pull request.
pub const CHANGES_COMMENT_TAG: &str = "changes";

#[derive(Debug, Clone, PartialEq)]
pub struct ChangesArgs {
    pub base_sha: String,
    pub pull_number: u64,
    pub repository: Repo,
    /// Overrides `changes.global_triggers` when not empty
    pub global_triggers: Vec<String>,
}

/// Pull request comment listing the changed units.
pub fn changes_comment(repository: &Repo, changed: &ChangedUnits) -> String {
    fn section(title: &str, units: &[&String], empty: &str) -> String {
        let list = if units.is_empty() {
            empty.to_string()
        } else {
            units
                .iter()
                .map(|u| format!("- `{}`", u))
                .collect::<Vec<_>>()
                .join("\n")
        };
        format!("#### {}\n\n{}", title, list)
    }

    let actions: Vec<&String> = changed.actions.iter().collect();
    let workflows: Vec<&String> = changed.workflows.iter().collect();
    [
        format!("### [{}]", repository),
        section("Changed actions", &actions, "No changed actions detected"),
        section("Changed workflows", &workflows, "No changed workflows detected"),
    ]
    .join("\n\n")
}

/// `changes`: matrices of changed actions and workflows.
///
/// With a GitHub client the summary comment of the pull request is created
/// or updated.
pub fn changes(
    ws: &Workspace,
    runner: &dyn GitRunner,
    git: &dyn GitQuery,
    github: Option<&dyn GitHubApi>,
    args: &ChangesArgs,
    outputs: &Outputs,
) -> Result<ChangedUnits> {
    let config = ws.config();
    runner.fetch(ws.root(), &config.release.remote)?;

    let global_triggers = if args.global_triggers.is_empty() {
        PathMatcher::from_rules(&config.changes.global_triggers)?
    } else {
        PathMatcher::from_rules(&args.global_triggers)?
    };

    let changed = ChangedUnits::detect(
        ws,
        &git,
        &args.base_sha,
        &args.repository.to_string(),
        args.pull_number,
        &global_triggers,
    )?;

    let actions: Vec<String> = changed.actions.iter().cloned().collect();
    let workflows: Vec<String> = changed.workflows.iter().cloned().collect();
    ui::display_unit_list("Changed actions", &actions, "No changed actions detected");
    ui::display_unit_list("Changed workflows", &workflows, "No changed workflows detected");

    if let Some(github) = github {
        let marker = CommentMarker::new(&config.github.comment_namespace, CHANGES_COMMENT_TAG);
        github.create_or_update_comment(
            args.pull_number,
            &marker,
            &changes_comment(&args.repository, &changed),
        )?;
    }

    outputs.set_json("matrix-actions", &Matrix::new(&actions))?;
    outputs.set("matrix-actions-empty", actions.is_empty())?;
    outputs.set_json("matrix-workflows", &Matrix::new(&workflows))?;
    outputs.set("matrix-workflows-empty", workflows.is_empty())?;

    Ok(changed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangedDirsArgs {
    pub base_sha: String,
    /// Only paths matching this regex count; every path when `None`
    pub regex: Option<String>,
    pub max_depth: usize,
    pub ignore_if_all_deletions: bool,
}

/// `changed-dirs`: matrix of changed directories.
pub fn changed_dirs(git: &dyn GitQuery, args: &ChangedDirsArgs, outputs: &Outputs) -> Result<Vec<String>> {
    let matcher = match &args.regex {
        Some(regex) => PathMatcher::from_regex(regex)?,
        None => PathMatcher::any(),
    };

    let diff = git.diff_since(&args.base_sha)?;
    let dirs = changed_directories(&diff, &matcher, args.max_depth, args.ignore_if_all_deletions);
    tracing::info!(count = dirs.len(), "changed directories");

    outputs.set_json("matrix", &Matrix::new(&dirs))?;
    outputs.set("matrix-empty", dirs.is_empty())?;
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangedUnits;

    #[test]
    fn test_changes_comment() {
        let repo: Repo = "acme/gha".parse().unwrap();
        let mut changed = ChangedUnits::default();
        changed.actions.insert("foo".to_string());

        let body = changes_comment(&repo, &changed);
        assert!(body.starts_with("### [acme/gha]"));
        assert!(body.contains("#### Changed actions\n\n- `foo`"));
        assert!(body.contains("No changed workflows detected"));
    }
}
