use crate::error::{CiError, Result};
use crate::git::{DiffRecord, GitQuery, GitStatus};
use glob::Pattern;

/// Mock repository for testing without actual git operations
#[derive(Debug, Default, Clone)]
pub struct MockRepository {
    records: Vec<DiffRecord>,
    tags: Vec<String>,
    remote_branches: Vec<String>,
}

impl MockRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a changed path
    pub fn with_change(mut self, status: GitStatus, path: impl Into<String>) -> Self {
        self.records.push(DiffRecord::new(status, path));
        self
    }

    /// Add a modified path
    pub fn with_modified(self, path: impl Into<String>) -> Self {
        self.with_change(GitStatus::Modified, path)
    }

    /// Add a deleted path
    pub fn with_deleted(self, path: impl Into<String>) -> Self {
        self.with_change(GitStatus::Deleted, path)
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Add a remote branch (without the remote prefix)
    pub fn with_remote_branch(mut self, branch: impl Into<String>) -> Self {
        self.remote_branches.push(branch.into());
        self
    }
}

fn filter(items: &[String], glob: &str) -> Result<Vec<String>> {
    let pattern =
        Pattern::new(glob).map_err(|e| CiError::pattern(format!("Invalid glob '{}': {}", glob, e)))?;
    Ok(items
        .iter()
        .filter(|item| pattern.matches(item))
        .cloned()
        .collect())
}

impl GitQuery for MockRepository {
    fn diff_since(&self, _base: &str) -> Result<Vec<DiffRecord>> {
        Ok(self.records.clone())
    }

    fn tags_matching(&self, glob: &str) -> Result<Vec<String>> {
        filter(&self.tags, glob)
    }

    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>> {
        filter(&self.remote_branches, glob)
    }
}
