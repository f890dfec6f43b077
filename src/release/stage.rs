//! Staging of the files published for a unit.

use crate::domain::{BuildUnit, UnitKind};
use crate::error::{CiError, Result};
use crate::unit_config::{CopyTarget, UnitConfig};
use crate::workspace::Workspace;
use glob::{MatchOptions, Pattern};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// `id` of an `action.yml` step that only runs from source checkouts.
pub const PREBUILD_STEP_ID: &str = "PREBUILD";

const COPY_GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Copy every file under `src` into `dst`, keeping relative paths and
/// skipping `.git`.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    let walker = WalkDir::new(src)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(|e| CiError::Io(e.into()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| CiError::config(e.to_string()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    Ok(())
}

/// Removes the [PREBUILD_STEP_ID] step of a composite action.
///
/// Returns `None` when there is nothing to remove.
pub fn strip_prebuild_step(action_yml: &str) -> Result<Option<String>> {
    let mut doc: Value = serde_yaml::from_str(action_yml)?;
    let Some(steps) = doc
        .get_mut("runs")
        .and_then(|runs| runs.get_mut("steps"))
        .and_then(Value::as_sequence_mut)
    else {
        return Ok(None);
    };

    let before = steps.len();
    steps.retain(|step| step.get("id").and_then(Value::as_str) != Some(PREBUILD_STEP_ID));
    if steps.len() == before {
        return Ok(None);
    }
    tracing::info!("removed {} step from action.yml", PREBUILD_STEP_ID);
    Ok(Some(serde_yaml::to_string(&doc)?))
}

fn stage_action(ws: &Workspace, name: &str, out: &Path) -> Result<()> {
    let dir = ws.action_dir(name);
    let action_yml = dir.join("action.yml");
    let contents = fs::read_to_string(&action_yml).map_err(|e| {
        CiError::config(format!("cannot read {}: {}", action_yml.display(), e))
    })?;
    match strip_prebuild_step(&contents)? {
        Some(stripped) => fs::write(out.join("action.yml"), stripped)?,
        None => copy_file(&action_yml, &out.join("action.yml"))?,
    }

    let dist = dir.join("dist");
    if dist.is_dir() {
        copy_tree(&dist, &out.join("dist"))?;
    }
    let readme = dir.join("README.md");
    if readme.is_file() {
        copy_file(&readme, &out.join("README.md"))?;
    }
    Ok(())
}

fn stage_workflow(ws: &Workspace, name: &str, out: &Path) -> Result<()> {
    let dir = ws.workflows_dir();
    let target = out.join(".github").join("workflows");
    fs::create_dir_all(&target)?;

    let main = format!("{}.yml", name);
    let readme = format!("{}.README.md", name);
    let sub_prefix = format!("{}.", name);

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type()?.is_file() {
            continue;
        }
        if file_name == readme {
            copy_file(&entry.path(), &out.join("README.md"))?;
        } else if file_name == main
            || (file_name.starts_with(&sub_prefix) && file_name.ends_with(".yml"))
        {
            tracing::debug!(file = %file_name, "staging workflow file");
            copy_file(&entry.path(), &target.join(&file_name))?;
        }
    }
    Ok(())
}

/// Copy files matching `pattern` (relative to `root`) according to `target`.
pub fn glob_copy(root: &Path, pattern: &str, target: &CopyTarget, out: &Path) -> Result<usize> {
    let root_str = root.to_string_lossy();
    let full = format!("{}/{}", Pattern::escape(root_str.trim_end_matches('/')), pattern);
    let paths = glob::glob_with(&full, COPY_GLOB_OPTIONS)
        .map_err(|e| CiError::pattern(format!("invalid copy glob '{}': {}", pattern, e)))?;

    let mut copied = 0;
    for path in paths {
        let path = path.map_err(|e| CiError::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .map_err(|e| CiError::config(e.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        let dest = target.destination_for(&relative);
        tracing::debug!(from = %relative, to = %dest, "copying configured file");
        copy_file(&path, &out.join(dest))?;
        copied += 1;
    }
    Ok(copied)
}

/// Stage the publishable contents of `unit` in a fresh temporary directory.
///
/// `prebuilt` replaces the default selection of files; the unit's `copy`
/// configuration is applied either way.
pub fn stage_contents(ws: &Workspace, unit: &BuildUnit, prebuilt: Option<&Path>) -> Result<TempDir> {
    let out = tempfile::tempdir()?;
    tracing::info!(unit = %unit, dir = %out.path().display(), "staging contents");

    match (prebuilt, unit.kind) {
        (Some(dir), _) => copy_tree(dir, out.path())?,
        (None, UnitKind::Action) => stage_action(ws, &unit.name, out.path())?,
        (None, UnitKind::Workflow) => stage_workflow(ws, &unit.name, out.path())?,
    }

    let config = UnitConfig::load(&ws.unit_config_path(unit))?;
    for (pattern, target) in &config.copy {
        let copied = glob_copy(ws.root(), pattern, target, out.path())?;
        if copied == 0 {
            tracing::warn!(pattern = %pattern, "copy pattern matched no files");
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn touch(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    const COMPOSITE: &str = r#"
name: foo
runs:
  using: composite
  steps:
    - id: PREBUILD
      run: npm run build
      shell: bash
    - run: echo hi
      shell: bash
"#;

    #[test]
    fn test_strip_prebuild_step() {
        let stripped = strip_prebuild_step(COMPOSITE).unwrap().unwrap();
        assert!(!stripped.contains("PREBUILD"));
        assert!(stripped.contains("echo hi"));

        let plain = "name: foo\nruns:\n  using: node20\n  main: dist/index.js\n";
        assert_eq!(strip_prebuild_step(plain).unwrap(), None);
    }

    #[test]
    fn test_stage_action() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "actions/foo/action.yml", COMPOSITE);
        touch(dir.path(), "actions/foo/dist/index.js", "x");
        touch(dir.path(), "actions/foo/README.md", "# foo");
        touch(dir.path(), "actions/foo/index.ts", "src");
        touch(
            dir.path(),
            "actions/foo/action-config.yml",
            "copy:\n  \"lib/shared/*.sh\":\n    dest: scripts\n    strip: lib/shared/\n",
        );
        touch(dir.path(), "lib/shared/run.sh", "#!/bin/sh");

        let ws = Workspace::new(dir.path(), Config::default());
        let unit = BuildUnit::action("foo").unwrap();
        let staged = stage_contents(&ws, &unit, None).unwrap();

        let out = staged.path();
        assert!(out.join("dist/index.js").is_file());
        assert!(out.join("README.md").is_file());
        assert!(out.join("scripts/run.sh").is_file());
        assert!(!out.join("index.ts").exists());
        let yml = fs::read_to_string(out.join("action.yml")).unwrap();
        assert!(!yml.contains("PREBUILD"));
    }

    #[test]
    fn test_stage_workflow() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), ".github/workflows/workflow-a.yml", "jobs: {}");
        touch(dir.path(), ".github/workflows/workflow-a.build.yml", "jobs: {}");
        touch(dir.path(), ".github/workflows/workflow-a.README.md", "# a");
        touch(dir.path(), ".github/workflows/workflow-ab.yml", "jobs: {}");

        let ws = Workspace::new(dir.path(), Config::default());
        let unit = BuildUnit::workflow("workflow-a").unwrap();
        let staged = stage_contents(&ws, &unit, None).unwrap();

        let out = staged.path();
        assert!(out.join(".github/workflows/workflow-a.yml").is_file());
        assert!(out.join(".github/workflows/workflow-a.build.yml").is_file());
        assert!(!out.join(".github/workflows/workflow-ab.yml").exists());
        assert_eq!(fs::read_to_string(out.join("README.md")).unwrap(), "# a");
    }

    #[test]
    fn test_prebuilt_contents_skip_git_dir() {
        let dir = tempfile::tempdir().unwrap();
        let prebuilt = tempfile::tempdir().unwrap();
        touch(prebuilt.path(), "action.yml", "name: foo");
        touch(prebuilt.path(), ".git/HEAD", "ref");

        let ws = Workspace::new(dir.path(), Config::default());
        let unit = BuildUnit::action("foo").unwrap();
        let staged = stage_contents(&ws, &unit, Some(prebuilt.path())).unwrap();
        assert!(staged.path().join("action.yml").is_file());
        assert!(!staged.path().join(".git").exists());
    }
}
