use crate::error::{CiError, Result};
use crate::github::{CommitStatus, GitHubApi, IssueComment, COMMENTS_PER_PAGE};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// A dispatched workflow: file, ref and inputs
pub type Dispatch = (String, String, BTreeMap<String, String>);

/// In-memory GitHub for testing the CI flows
#[derive(Debug, Default)]
pub struct MockGitHub {
    labels: BTreeMap<u64, Vec<String>>,
    comments: RefCell<Vec<IssueComment>>,
    created: RefCell<Vec<(u64, String)>>,
    files: BTreeSet<String>,
    refs: RefCell<BTreeMap<String, String>>,
    failing_refs: BTreeSet<String>,
    statuses: RefCell<Vec<(String, CommitStatus)>>,
    dispatches: RefCell<Vec<Dispatch>>,
    deleted_refs: RefCell<Vec<String>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<S: Into<String>>(mut self, pull_number: u64, labels: Vec<S>) -> Self {
        self.labels
            .insert(pull_number, labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_comment(self, id: u64, body: &str) -> Self {
        self.comments.borrow_mut().push(IssueComment {
            id,
            body: Some(body.to_string()),
        });
        self
    }

    /// A file present in the repository at every ref
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.insert(path.into());
        self
    }

    pub fn with_ref(self, git_ref: impl Into<String>, sha: impl Into<String>) -> Self {
        self.refs.borrow_mut().insert(git_ref.into(), sha.into());
        self
    }

    /// A ref that exists but whose deletion fails
    pub fn with_undeletable_ref(mut self, git_ref: impl Into<String>) -> Self {
        let git_ref = git_ref.into();
        self.refs
            .borrow_mut()
            .insert(git_ref.clone(), "0".repeat(40));
        self.failing_refs.insert(git_ref);
        self
    }

    pub fn comment_body(&self, id: u64) -> Option<String> {
        self.comments
            .borrow()
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.body.clone())
    }

    pub fn created_comments(&self) -> Vec<(u64, String)> {
        self.created.borrow().clone()
    }

    pub fn statuses(&self) -> Vec<(String, CommitStatus)> {
        self.statuses.borrow().clone()
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.borrow().clone()
    }

    pub fn deleted_refs(&self) -> Vec<String> {
        self.deleted_refs.borrow().clone()
    }
}

impl GitHubApi for MockGitHub {
    fn pull_request_labels(&self, pull_number: u64) -> Result<Vec<String>> {
        self.labels
            .get(&pull_number)
            .cloned()
            .ok_or_else(|| CiError::GitHub {
                status: 404,
                message: format!("pull request {} not found", pull_number),
            })
    }

    fn issue_comments(&self, _issue_number: u64, page: u32) -> Result<Vec<IssueComment>> {
        let start = (page.saturating_sub(1) as usize) * COMMENTS_PER_PAGE;
        Ok(self
            .comments
            .borrow()
            .iter()
            .skip(start)
            .take(COMMENTS_PER_PAGE)
            .cloned()
            .collect())
    }

    fn create_comment(&self, issue_number: u64, body: &str) -> Result<()> {
        let id = 1_000_000 + self.created.borrow().len() as u64;
        self.created
            .borrow_mut()
            .push((issue_number, body.to_string()));
        self.comments.borrow_mut().push(IssueComment {
            id,
            body: Some(body.to_string()),
        });
        Ok(())
    }

    fn update_comment(&self, comment_id: u64, body: &str) -> Result<()> {
        let mut comments = self.comments.borrow_mut();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| CiError::GitHub {
                status: 404,
                message: format!("comment {} not found", comment_id),
            })?;
        comment.body = Some(body.to_string());
        Ok(())
    }

    fn create_commit_status(&self, sha: &str, status: &CommitStatus) -> Result<()> {
        self.statuses
            .borrow_mut()
            .push((sha.to_string(), status.clone()));
        Ok(())
    }

    fn dispatch_workflow(
        &self,
        workflow_file: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.dispatches.borrow_mut().push((
            workflow_file.to_string(),
            git_ref.to_string(),
            inputs.clone(),
        ));
        Ok(())
    }

    fn get_ref(&self, git_ref: &str) -> Result<Option<String>> {
        Ok(self.refs.borrow().get(git_ref).cloned())
    }

    fn delete_ref(&self, git_ref: &str) -> Result<()> {
        if self.failing_refs.contains(git_ref) {
            return Err(CiError::GitHub {
                status: 422,
                message: format!("cannot delete {}", git_ref),
            });
        }
        self.refs.borrow_mut().remove(git_ref);
        self.deleted_refs.borrow_mut().push(git_ref.to_string());
        Ok(())
    }

    fn file_exists(&self, path: &str, _git_ref: &str) -> Result<bool> {
        Ok(self.files.contains(path))
    }
}
