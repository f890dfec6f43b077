use crate::error::Result;
use crate::github::payload::{status_context, test_workflow_file};
use crate::github::{CommitState, CommitStatus, GitHubApi, NeedsContext, Repo, TestPayload};
use crate::ui;
use crate::workspace::Workspace;
use std::collections::BTreeMap;

/// Workflow input carrying the serialized [TestPayload].
pub const PAYLOAD_INPUT: &str = "ctx";

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerTestsArgs {
    pub unit: String,
    pub pull_number: u64,
    /// Branch the unit was just published to
    pub version_branch: String,
    pub head_sha: String,
    pub head_ref: String,
    pub release: bool,
}

/// `trigger-tests`: dispatch the unit's test workflow, if it has one.
///
/// A pending commit status is created first and finalized by
/// [report_test] once the test workflow is done.
pub fn trigger_tests(
    ws: &Workspace,
    github: &dyn GitHubApi,
    args: &TriggerTestsArgs,
) -> Result<Option<TestPayload>> {
    let workflow_file = test_workflow_file(&args.unit);
    let workflow_path = ws.workflow_rel(&workflow_file);

    if !github.file_exists(&workflow_path, &args.head_sha)? {
        ui::display_status(&format!("No test workflow {} found, skipping", workflow_path));
        return Ok(None);
    }

    let payload = TestPayload {
        sha: args.head_sha.clone(),
        git_ref: args.version_branch.clone(),
        status_context: status_context(&args.unit),
        pull_number: args.pull_number,
    };

    github.create_commit_status(
        &args.head_sha,
        &CommitStatus {
            state: CommitState::Pending,
            context: payload.status_context.clone(),
            target_url: None,
            description: None,
        },
    )?;

    let dispatch_ref = if args.release {
        ws.config().github.default_branch.as_str()
    } else {
        args.head_ref.as_str()
    };
    let mut inputs = BTreeMap::new();
    inputs.insert(PAYLOAD_INPUT.to_string(), payload.to_json()?);
    github.dispatch_workflow(&workflow_file, dispatch_ref, &inputs)?;

    ui::display_success(&format!("Triggered {} on {}", workflow_file, dispatch_ref));
    Ok(Some(payload))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportTestArgs {
    pub repository: Repo,
    /// JSON of the `needs` context
    pub needs: String,
    /// JSON of the [TestPayload] the test workflow received
    pub payload: String,
    pub run_id: u64,
    pub server_url: String,
}

/// `report-test`: turn the result of a test run into the final commit
/// status.
pub fn report_test(github: &dyn GitHubApi, args: &ReportTestArgs) -> Result<CommitState> {
    let needs = NeedsContext::parse(&args.needs)?;
    let payload = TestPayload::parse(&args.payload)?;

    let failed = needs.failed_jobs();
    let state = if failed.is_empty() {
        CommitState::Success
    } else {
        tracing::warn!(jobs = ?failed, "test jobs failed");
        CommitState::Failure
    };

    let target_url = format!(
        "{}/{}/actions/runs/{}",
        args.server_url.trim_end_matches('/'),
        args.repository,
        args.run_id
    );
    github.create_commit_status(
        &payload.sha,
        &CommitStatus {
            state,
            context: payload.status_context.clone(),
            target_url: Some(target_url),
            description: None,
        },
    )?;

    ui::display_status(&format!("{}: {}", payload.status_context, state));
    Ok(state)
}
