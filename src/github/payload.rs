use crate::error::{CiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Context handed to a dispatched test workflow and back to `report-test`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPayload {
    /// Head commit the status is reported on
    pub sha: String,
    /// Branch holding the published unit
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(alias = "commitStatusContext")]
    pub status_context: String,
    pub pull_number: u64,
}

impl TestPayload {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CiError::validation(format!("Invalid test payload: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Commit status context of a unit's test run.
pub fn status_context(unit: &str) -> String {
    format!("CI Test: {}", unit)
}

/// Test workflow file of a unit.
pub fn test_workflow_file(unit: &str) -> String {
    format!("test-{}.yml", unit)
}

#[derive(Debug, Clone, Deserialize)]
struct NeedResult {
    #[serde(default)]
    result: Option<String>,
}

/// The `needs` context of a finished workflow run
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct NeedsContext {
    jobs: BTreeMap<String, NeedResult>,
}

impl NeedsContext {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CiError::validation(format!("Invalid needs context: {}", e)))
    }

    /// Jobs whose result is `failure`.
    pub fn failed_jobs(&self) -> Vec<&str> {
        self.jobs
            .iter()
            .filter(|(_, need)| need.result.as_deref() == Some("failure"))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn any_failed(&self) -> bool {
        !self.failed_jobs().is_empty()
    }
}
