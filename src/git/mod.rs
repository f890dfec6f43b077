//! Git query facade
//!
//! The [GitQuery] trait answers the three questions change detection and
//! versioning ask of git: what changed since a base ref, which tags exist
//! for a lineage, and which remote branches exist for a glob.
//!
//! # Implementations
//!
//! - [cli::CliRepository]: runs the `git` executable through a [GitRunner]
//! - [repository::Git2Repository]: answers the same queries with `git2`
//! - [mock::MockRepository]: canned answers for tests
//!
//! Mutations (fetch, checkout, commit, tag, push) always go through a
//! [GitRunner], see [crate::release].

pub mod cli;
pub mod command;
pub mod mock;
pub mod repository;

pub use cli::CliRepository;
pub use command::{GitRunner, SystemGit};
pub use mock::MockRepository;
pub use repository::{discover_root, Git2Repository};

use crate::error::Result;
use std::fmt;

/// Status of one `git diff --name-status` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitStatus {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    TypeChanged,
    Unmerged,
    Unknown,
    Broken,
}

impl GitStatus {
    /// Parse a status code; rename/copy scores (`R100`, `C075`) are accepted.
    pub fn from_code(code: &str) -> Option<Self> {
        let status = match code.chars().next()? {
            'A' => GitStatus::Added,
            'C' => GitStatus::Copied,
            'D' => GitStatus::Deleted,
            'M' => GitStatus::Modified,
            'R' => GitStatus::Renamed,
            'T' => GitStatus::TypeChanged,
            'U' => GitStatus::Unmerged,
            'X' => GitStatus::Unknown,
            'B' => GitStatus::Broken,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(&self) -> char {
        match self {
            GitStatus::Added => 'A',
            GitStatus::Copied => 'C',
            GitStatus::Deleted => 'D',
            GitStatus::Modified => 'M',
            GitStatus::Renamed => 'R',
            GitStatus::TypeChanged => 'T',
            GitStatus::Unmerged => 'U',
            GitStatus::Unknown => 'X',
            GitStatus::Broken => 'B',
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(self, GitStatus::Deleted)
    }
}

impl fmt::Display for GitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// One changed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub status: GitStatus,
    /// Path relative to the repository root; the destination for renames
    pub path: String,
}

impl DiffRecord {
    pub fn new(status: GitStatus, path: impl Into<String>) -> Self {
        DiffRecord {
            status,
            path: path.into(),
        }
    }

    pub fn is_deletion(&self) -> bool {
        self.status.is_deletion()
    }
}

/// Parses porcelain `git diff --name-status` output.
///
/// Lines are `STATUS\tPATH`, or `R###\tOLD\tNEW` / `C###\tOLD\tNEW` for
/// renames and copies, of which only the destination is kept. Blank or
/// unrecognized lines are skipped.
pub fn parse_name_status(output: &str) -> Vec<DiffRecord> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.trim_start().split('\t');
            let status = GitStatus::from_code(fields.next()?.trim())?;
            let paths: Vec<&str> = fields.filter(|f| !f.is_empty()).collect();
            let path = match status {
                GitStatus::Renamed | GitStatus::Copied => paths.last()?,
                _ => paths.first()?,
            };
            Some(DiffRecord::new(status, *path))
        })
        .collect()
}

/// Read-only git queries used by change detection and versioning
pub trait GitQuery {
    /// Changes between `base` and the working tree.
    ///
    /// The result is one snapshot; callers that need it more than once keep
    /// the returned vector.
    fn diff_since(&self, base: &str) -> Result<Vec<DiffRecord>>;

    /// Tags matching a glob. No match is an empty list, not an error.
    fn tags_matching(&self, glob: &str) -> Result<Vec<String>>;

    /// Remote branches matching a glob, without the remote prefix.
    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>>;
}

impl<Q: GitQuery + ?Sized> GitQuery for &Q {
    fn diff_since(&self, base: &str) -> Result<Vec<DiffRecord>> {
        (**self).diff_since(base)
    }

    fn tags_matching(&self, glob: &str) -> Result<Vec<String>> {
        (**self).tags_matching(glob)
    }

    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>> {
        (**self).remote_branches_matching(glob)
    }
}

impl<Q: GitQuery + ?Sized> GitQuery for Box<Q> {
    fn diff_since(&self, base: &str) -> Result<Vec<DiffRecord>> {
        (**self).diff_since(base)
    }

    fn tags_matching(&self, glob: &str) -> Result<Vec<String>> {
        (**self).tags_matching(glob)
    }

    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>> {
        (**self).remote_branches_matching(glob)
    }
}
