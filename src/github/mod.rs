//! GitHub REST collaborator
//!
//! [GitHubApi] is the seam between the CI flows and the REST API:
//! [client::GitHubClient] talks to GitHub, [mock::MockGitHub] records calls
//! for tests.

pub mod client;
pub mod comment;
pub mod mock;
pub mod payload;

pub use client::GitHubClient;
pub use comment::CommentMarker;
pub use mock::MockGitHub;
pub use payload::{NeedsContext, TestPayload};

use crate::error::{CiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// `owner/name` of a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl FromStr for Repo {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Repo {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(CiError::validation(format!(
                "Invalid repository '{}', expected owner/name",
                s
            ))),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Success => "success",
            CommitState::Failure => "failure",
            CommitState::Error => "error",
        }
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a commit status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitStatus {
    pub state: CommitState,
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueComment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

/// Comments fetched per page when searching for a marker.
pub const COMMENTS_PER_PAGE: usize = 100;

/// GitHub operations used by the CI flows, scoped to one repository.
pub trait GitHubApi {
    /// Label names of a pull request.
    fn pull_request_labels(&self, pull_number: u64) -> Result<Vec<String>>;

    /// One page (1-based) of issue comments.
    fn issue_comments(&self, issue_number: u64, page: u32) -> Result<Vec<IssueComment>>;

    fn create_comment(&self, issue_number: u64, body: &str) -> Result<()>;

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()>;

    fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()>;

    /// `workflow_dispatch` of a workflow file on `git_ref`.
    fn dispatch_workflow(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// SHA a ref (`heads/<branch>`) points to; `None` when it does not exist.
    fn get_ref(&self, git_ref: &str) -> Result<Option<String>>;

    fn delete_ref(&self, git_ref: &str) -> Result<()>;

    /// True if `path` exists at `git_ref`.
    fn file_exists(&self, path: &str, git_ref: &str) -> Result<bool>;

    /// First comment of an issue containing `marker`.
    fn find_comment(&self, issue_number: u64, marker: &CommentMarker) -> Result<Option<u64>> {
        let mut page = 1;
        loop {
            let comments = self.issue_comments(issue_number, page)?;
            if let Some(found) = comments.iter().find(|c| {
                c.body
                    .as_deref()
                    .is_some_and(|body| marker.is_in(body))
            }) {
                return Ok(Some(found.id));
            }
            if comments.len() < COMMENTS_PER_PAGE {
                return Ok(None);
            }
            page += 1;
        }
    }

    /// Updates the comment tagged with `marker`, or creates it.
    fn create_or_update_comment(
        &self,
        issue_number: u64,
        marker: &CommentMarker,
        body: &str,
    ) -> Result<()> {
        let body = marker.append_to(body);
        match self.find_comment(issue_number, marker)? {
            Some(id) => {
                tracing::debug!(id, "updating tagged comment");
                self.update_comment(id, &body)
            }
            None => {
                tracing::debug!(issue_number, "creating tagged comment");
                self.create_comment(issue_number, &body)
            }
        }
    }
}

impl<G: GitHubApi + ?Sized> GitHubApi for &G {
    fn pull_request_labels(&self, pull_number: u64) -> Result<Vec<String>> {
        (**self).pull_request_labels(pull_number)
    }

    fn issue_comments(&self, issue_number: u64, page: u32) -> Result<Vec<IssueComment>> {
        (**self).issue_comments(issue_number, page)
    }

    fn create_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        (**self).create_comment(issue_number, body)
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        (**self).update_comment(comment_id, body)
    }

    fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        (**self).create_commit_status(sha, status)
    }

    fn dispatch_workflow(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        (**self).dispatch_workflow(workflow_file, git_ref, inputs)
    }

    fn get_ref(&self, git_ref: &str) -> Result<Option<String>> {
        (**self).get_ref(git_ref)
    }

    fn delete_ref(&self, git_ref: &str) -> Result<()> {
        (**self).delete_ref(git_ref)
    }

    fn file_exists(&self, path: &str, git_ref: &str) -> Result<bool> {
        (**self).file_exists(path, git_ref)
    }
}
