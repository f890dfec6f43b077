//! Repository root plus configuration, passed to every flow.

use crate::config::Config;
use crate::domain::{BuildUnit, UnitKind};
use crate::error::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Reusable workflow unit files: `workflow-<name>.yml` or `wf-<name>.yml`,
/// no further dots (those are sub-workflows).
const WORKFLOW_UNIT_FILE: &str = r"^(workflow|wf)-[^.]+\.yml$";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Workspace {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn actions_dir(&self) -> PathBuf {
        self.root.join(&self.config.layout.actions_dir)
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join(&self.config.layout.workflows_dir)
    }

    pub fn action_dir(&self, name: &str) -> PathBuf {
        self.actions_dir().join(name)
    }

    pub fn action_config_path(&self, name: &str) -> PathBuf {
        self.action_dir(name)
            .join(&self.config.layout.action_config_file)
    }

    pub fn workflow_config_path(&self, name: &str) -> PathBuf {
        self.root
            .join(&self.config.layout.workflows_config_dir)
            .join(format!("{}.config.yml", name))
    }

    /// Repository-relative path of a workflow file, `/`-separated.
    pub fn workflow_rel(&self, file_name: &str) -> String {
        join_rel(&self.config.layout.workflows_dir, file_name)
    }

    /// Repository-relative path of an action directory, `/`-separated.
    pub fn action_rel(&self, name: &str) -> String {
        join_rel(&self.config.layout.actions_dir, name)
    }

    /// Configuration file of a unit, whichever kind it is.
    pub fn unit_config_path(&self, unit: &BuildUnit) -> PathBuf {
        match unit.kind {
            UnitKind::Action => self.action_config_path(&unit.name),
            UnitKind::Workflow => self.workflow_config_path(&unit.name),
        }
    }

    /// Action names: every subdirectory of the actions root whose name is a
    /// valid unit name, sorted.
    pub fn list_actions(&self) -> Result<Vec<String>> {
        let dir = self.actions_dir();
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no actions directory");
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if is_unit_name(UnitKind::Action, &name) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Workflow unit names (file stems), sorted.
    pub fn list_workflows(&self) -> Result<Vec<String>> {
        let dir = self.workflows_dir();
        if !dir.is_dir() {
            tracing::debug!(dir = %dir.display(), "no workflows directory");
            return Ok(Vec::new());
        }

        let unit_file = Regex::new(WORKFLOW_UNIT_FILE)
            .map_err(|e| crate::error::CiError::pattern(e.to_string()))?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_file() && unit_file.is_match(&file_name) {
                if let Some(stem) = file_name.strip_suffix(".yml") {
                    if is_unit_name(UnitKind::Workflow, stem) {
                        names.push(stem.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// True if `unit` exists in the working tree.
    pub fn unit_exists(&self, unit: &BuildUnit) -> bool {
        match unit.kind {
            UnitKind::Action => self.action_dir(&unit.name).is_dir(),
            UnitKind::Workflow => self
                .workflows_dir()
                .join(format!("{}.yml", unit.name))
                .is_file(),
        }
    }
}

fn is_unit_name(kind: UnitKind, name: &str) -> bool {
    match BuildUnit::new(kind, name) {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(name, error = %e, "skipping {} that is not a unit", kind);
            false
        }
    }
}

fn join_rel(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
