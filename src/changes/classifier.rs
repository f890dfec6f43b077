//! Which build units a diff affects.
//!
//! Every tier adds units to one set, so the result is the union of tiers
//! regardless of evaluation order.
//!
//! # Actions
//!
//! 1. A file under `actions/<name>/` changed and the directory still exists
//!    (all-deletion directories and `changes.ignore_paths` excluded)
//! 2. Its test workflow `test-<name>.yml` changed
//! 3. A global trigger changed and the action has source files
//! 4. A path of its `changesPaths` changed
//!
//! # Workflows
//!
//! 1. The unit file, a sub-workflow or its README changed
//! 2. Its test workflow changed
//! 3. A workflow global trigger changed
//! 4. A path of its `changesPaths` changed
//! 5. It uses a changed action at its latest major or at the PR dev branch

use crate::changes::aggregate::{changed_directories, changed_files, ChangeAggregate};
use crate::changes::workflows::workflows_using_action;
use crate::domain::{dev_branch_name, latest_major_branch, BuildUnit, TagPrefix};
use crate::error::Result;
use crate::git::{DiffRecord, GitQuery};
use crate::matcher::{PathMatcher, PathRule};
use crate::unit_config::UnitConfig;
use crate::workspace::Workspace;
use std::collections::{BTreeMap, BTreeSet};
use walkdir::WalkDir;

/// Changed actions and workflows of one pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedUnits {
    pub actions: BTreeSet<String>,
    pub workflows: BTreeSet<String>,
}

impl ChangedUnits {
    /// Runs both classifiers over one diff snapshot.
    pub fn detect<Q: GitQuery>(
        ws: &Workspace,
        git: &Q,
        base: &str,
        repository: &str,
        pull_number: u64,
        global_triggers: &PathMatcher,
    ) -> Result<Self> {
        let diff = git.diff_since(base)?;
        tracing::debug!(records = diff.len(), base, "diff snapshot");

        let actions = classify_changed_actions(ws, &diff, global_triggers)?;
        let lineages = action_lineages(git, &actions)?;
        let workflows = classify_changed_workflows(ws, &diff, &lineages, repository, pull_number)?;

        Ok(ChangedUnits { actions, workflows })
    }
}

struct Found {
    kind: &'static str,
    units: BTreeSet<String>,
}

impl Found {
    fn new(kind: &'static str) -> Self {
        Found {
            kind,
            units: BTreeSet::new(),
        }
    }

    fn add(&mut self, unit: &str, reason: &str) {
        if self.units.insert(unit.to_string()) {
            tracing::info!(unit, reason, "found changed {}", self.kind);
        } else {
            tracing::debug!(unit, reason, "{} already marked as changed", self.kind);
        }
    }
}

fn escaped_prefix(dir: &str) -> String {
    format!("^{}/", regex::escape(dir.trim_end_matches('/')))
}

fn paths(diff: &[DiffRecord]) -> impl Iterator<Item = &str> {
    diff.iter().map(|r| r.path.as_str())
}

/// Units whose test workflow `test-<unit>.yml` changed (not deleted).
fn changed_test_workflows(ws: &Workspace, diff: &[DiffRecord], units: &[String]) -> Result<Vec<String>> {
    let dir = &ws.config().layout.workflows_dir;
    let matcher = PathMatcher::from_regex(&format!(r"{}test-[^/]+\.yml$", escaped_prefix(dir)))?;
    let prefix = format!("{}test-", ws.workflow_rel(""));

    Ok(changed_files(diff, &matcher, true)
        .into_iter()
        .filter_map(|path| {
            path.strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".yml"))
                .map(str::to_string)
        })
        .filter(|name| units.contains(name))
        .collect())
}

/// Units whose `changesPaths` match any changed path.
fn changed_by_override(
    ws: &Workspace,
    diff: &[DiffRecord],
    units: &[String],
    unit_of: impl Fn(&str) -> Result<BuildUnit>,
    found: &mut Found,
) -> Result<()> {
    for name in units {
        let unit = unit_of(name)?;
        let config = UnitConfig::load(&ws.unit_config_path(&unit))?;
        if let Some(matcher) = config.changes_matcher()? {
            if matcher.matches_any(paths(diff)) {
                found.add(name, "changesPaths matched");
            }
        }
    }
    Ok(())
}

fn has_source_file(ws: &Workspace, action: &str) -> bool {
    let extensions = &ws.config().changes.source_extensions;
    WalkDir::new(ws.action_dir(action))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|e| e == ext))
        })
}

/// Changed actions of a diff.
pub fn classify_changed_actions(
    ws: &Workspace,
    diff: &[DiffRecord],
    global_triggers: &PathMatcher,
) -> Result<BTreeSet<String>> {
    let changes = &ws.config().changes;
    let actions = ws.list_actions()?;
    let mut found = Found::new("action");

    // Directory tier
    let ignored = PathMatcher::from_rules(&changes.ignore_paths)?;
    let relevant: Vec<DiffRecord> = diff
        .iter()
        .filter(|r| !ignored.is_match(&r.path))
        .cloned()
        .collect();
    let actions_dir = ws.config().layout.actions_dir.trim_end_matches('/');
    let depth = actions_dir.split('/').count();
    let under_actions = PathMatcher::from_regex(&escaped_prefix(actions_dir))?;
    let dir_prefix = format!("{}/", actions_dir);
    for dir in changed_directories(
        &relevant,
        &under_actions,
        depth,
        changes.ignore_if_all_deletions,
    ) {
        match dir.strip_prefix(&dir_prefix) {
            Some(name) if actions.iter().any(|a| a == name) => {
                found.add(name, "changed action directory");
            }
            Some(name) => tracing::debug!(name, "changed directory is not an action"),
            None => {}
        }
    }

    // Test workflow tier
    for name in changed_test_workflows(ws, diff, &actions)? {
        found.add(&name, "changed action test workflow");
    }

    // Global trigger tier
    if global_triggers.matches_any(paths(diff)) {
        for name in &actions {
            if has_source_file(ws, name) {
                found.add(name, "global trigger changed");
            }
        }
    }

    changed_by_override(ws, diff, &actions, |name| BuildUnit::action(name), &mut found)?;

    Ok(found.units)
}

/// Latest major version branch of each action, `None` when unreleased.
pub fn action_lineages<Q: GitQuery>(
    git: &Q,
    actions: &BTreeSet<String>,
) -> Result<BTreeMap<String, Option<u64>>> {
    let mut lineages = BTreeMap::new();
    for action in actions {
        let branches = git.remote_branches_matching(&TagPrefix::for_unit(action).glob())?;
        lineages.insert(action.clone(), latest_major_branch(&branches));
    }
    Ok(lineages)
}

fn workflow_unit_files(ws: &Workspace, name: &str) -> Result<PathMatcher> {
    let escaped = glob::Pattern::escape(name);
    Ok(PathMatcher::new(vec![
        PathRule::Exact(ws.workflow_rel(&format!("{}.yml", name))),
        PathRule::Exact(ws.workflow_rel(&format!("{}.README.md", name))),
        PathRule::glob(&ws.workflow_rel(&format!("{}.*.yml", escaped)))?,
    ]))
}

/// Changed workflows of a diff.
///
/// `changed_actions` maps each changed action to its latest major version
/// (see [action_lineages]).
pub fn classify_changed_workflows(
    ws: &Workspace,
    diff: &[DiffRecord],
    changed_actions: &BTreeMap<String, Option<u64>>,
    repository: &str,
    pull_number: u64,
) -> Result<BTreeSet<String>> {
    let changes = &ws.config().changes;
    let workflows = ws.list_workflows()?;
    let mut found = Found::new("workflow");

    // File tier
    let mut aggregate = ChangeAggregate::new();
    for name in &workflows {
        let matcher = workflow_unit_files(ws, name)?;
        for record in diff.iter().filter(|r| matcher.is_match(&r.path)) {
            aggregate.record(name.as_str(), record.is_deletion());
        }
    }
    for name in aggregate.keys(changes.ignore_if_all_deletions) {
        found.add(&name, "changed workflow file");
    }

    // Test workflow tier
    for name in changed_test_workflows(ws, diff, &workflows)? {
        found.add(&name, "changed workflow test file");
    }

    // Global trigger tier
    let triggers = PathMatcher::from_rules(&changes.workflow_global_triggers)?;
    if triggers.matches_any(paths(diff)) {
        for name in &workflows {
            found.add(name, "workflow global trigger changed");
        }
    }

    changed_by_override(ws, diff, &workflows, |name| BuildUnit::workflow(name), &mut found)?;

    // Referenced action tier
    for (action, latest_major) in changed_actions {
        let mut suffixes = Vec::new();
        if let Some(major) = latest_major {
            suffixes.push(format!("v{}", major));
        }
        let dev_branch = dev_branch_name(action, pull_number);
        if let Some(suffix) = dev_branch.strip_prefix(&format!("{}/", action)) {
            suffixes.push(suffix.to_string());
        }

        for (workflow, variant) in workflows_using_action(ws, repository, action, &suffixes)? {
            found.add(&workflow, &format!("uses changed action {}", variant));
        }
    }

    Ok(found.units)
}
