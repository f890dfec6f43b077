//! `uses:` references inside reusable workflow files

use crate::error::Result;
use crate::workspace::Workspace;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
struct WorkflowFile {
    #[serde(default)]
    jobs: BTreeMap<String, Job>,
}

#[derive(Debug, Default, Deserialize)]
struct Job {
    #[serde(default)]
    uses: Option<String>,
    #[serde(default)]
    steps: Vec<Step>,
}

#[derive(Debug, Default, Deserialize)]
struct Step {
    #[serde(default)]
    uses: Option<String>,
}

/// Every job-level and step-level `uses:` value of a workflow file.
pub fn workflow_uses(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let workflow: Option<WorkflowFile> = serde_yaml::from_str(&contents)?;
    let Some(workflow) = workflow else {
        return Ok(Vec::new());
    };

    let mut uses = Vec::new();
    for job in workflow.jobs.into_values() {
        uses.extend(job.uses);
        uses.extend(job.steps.into_iter().filter_map(|step| step.uses));
    }
    Ok(uses)
}

/// Workflow units referring to `{repository}@{action}/{suffix}` for any of
/// `suffixes`, with the matched reference.
///
/// The unit file and its sub-workflows (`{name}.*.yml`) are scanned.
pub fn workflows_using_action(
    ws: &Workspace,
    repository: &str,
    action: &str,
    suffixes: &[String],
) -> Result<Vec<(String, String)>> {
    let variants: Vec<String> = suffixes
        .iter()
        .map(|suffix| format!("{}@{}/{}", repository, action, suffix))
        .collect();

    let mut found = Vec::new();
    for workflow in ws.list_workflows()? {
        'files: for file in workflow_files(ws, &workflow)? {
            for reference in workflow_uses(&file)? {
                if let Some(variant) = variants.iter().find(|v| **v == reference) {
                    found.push((workflow.clone(), variant.clone()));
                    break 'files;
                }
            }
        }
    }
    Ok(found)
}

fn workflow_files(ws: &Workspace, workflow: &str) -> Result<Vec<std::path::PathBuf>> {
    let dir = ws.workflows_dir();
    let mut files = vec![dir.join(format!("{}.yml", workflow))];

    let sub_prefix = format!("{}.", workflow);
    let mut subs = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with(&sub_prefix) && name.ends_with(".yml") {
            subs.push(dir.join(name));
        }
    }
    subs.sort();
    files.extend(subs);
    Ok(files)
}
