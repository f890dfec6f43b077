use crate::error::{CiError, Result};
use crate::git::{DiffRecord, GitQuery, GitStatus};
use git2::{BranchType, Delta, DiffFindOptions, DiffOptions, Repository as Git2Repo};
use glob::Pattern;
use std::path::Path;

/// [GitQuery] answered in-process with git2
pub struct Git2Repository {
    repo: Git2Repo,
    remote: String,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P, remote: impl Into<String>) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;

        Ok(Git2Repository {
            repo,
            remote: remote.into(),
        })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo, remote: impl Into<String>) -> Self {
        Git2Repository {
            repo,
            remote: remote.into(),
        }
    }

    /// Working directory of the repository; `None` for bare repositories.
    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }
}

/// Root of the working tree containing `path`.
pub fn discover_root(path: &Path) -> Result<std::path::PathBuf> {
    let repo = Git2Repo::discover(path)?;
    repo.workdir()
        .map(Path::to_path_buf)
        .ok_or_else(|| CiError::config(format!("'{}' is a bare repository", path.display())))
}

fn status_of(delta: Delta) -> Option<GitStatus> {
    let status = match delta {
        Delta::Added => GitStatus::Added,
        Delta::Deleted => GitStatus::Deleted,
        Delta::Modified => GitStatus::Modified,
        Delta::Renamed => GitStatus::Renamed,
        Delta::Copied => GitStatus::Copied,
        Delta::Typechange => GitStatus::TypeChanged,
        Delta::Conflicted => GitStatus::Unmerged,
        Delta::Unreadable => GitStatus::Unknown,
        Delta::Unmodified | Delta::Ignored | Delta::Untracked => return None,
    };
    Some(status)
}

fn glob_pattern(glob: &str) -> Result<Pattern> {
    Pattern::new(glob).map_err(|e| CiError::pattern(format!("Invalid glob '{}': {}", glob, e)))
}

impl GitQuery for Git2Repository {
    fn diff_since(&self, base: &str) -> Result<Vec<DiffRecord>> {
        let tree = self
            .repo
            .revparse_single(base)
            .and_then(|object| object.peel_to_tree())
            .map_err(|e| CiError::validation(format!("Cannot resolve '{}': {}", base, e)))?;

        let mut opts = DiffOptions::new();
        let mut diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&tree), Some(&mut opts))?;
        diff.find_similar(Some(DiffFindOptions::new().renames(true).copies(true)))?;

        let records = diff
            .deltas()
            .filter_map(|delta| {
                let status = status_of(delta.status())?;
                let path = delta.new_file().path().or_else(|| delta.old_file().path())?;
                Some(DiffRecord::new(status, path.to_string_lossy()))
            })
            .collect();

        Ok(records)
    }

    fn tags_matching(&self, glob: &str) -> Result<Vec<String>> {
        let names = self.repo.tag_names(Some(glob))?;
        Ok(names.iter().flatten().map(str::to_string).collect())
    }

    fn remote_branches_matching(&self, glob: &str) -> Result<Vec<String>> {
        let pattern = glob_pattern(glob)?;
        let prefix = format!("{}/", self.remote);
        let mut matched = Vec::new();

        for entry in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = entry?;
            let Some(name) = branch.name()? else {
                continue;
            };
            let Some(short) = name.strip_prefix(&prefix) else {
                continue;
            };
            if short == "HEAD" {
                continue;
            }
            if pattern.matches(short) {
                matched.push(short.to_string());
            }
        }

        matched.sort();
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;

    fn commit_all(repo: &Git2Repo, message: &str) -> git2::Oid {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.update_all(["*"].iter(), None).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.target())
            .map(|oid| vec![repo.find_commit(oid).unwrap()])
            .unwrap_or_default();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_diff_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Git2Repo::init(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("actions/foo")).unwrap();
        fs::write(dir.path().join("actions/foo/index.ts"), "a").unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();
        let base = commit_all(&repo, "initial");

        let head = repo.find_commit(base).unwrap();
        repo.tag_lightweight("foo/v1.0.0", head.as_object(), false)
            .unwrap();
        repo.tag_lightweight("bar/v1.0.0", head.as_object(), false)
            .unwrap();

        fs::write(dir.path().join("actions/foo/index.ts"), "b").unwrap();
        fs::remove_file(dir.path().join("README.md")).unwrap();
        commit_all(&repo, "change");
        drop(head);

        let git = Git2Repository::from_git2(repo, "origin");
        let mut records = git.diff_since(&base.to_string()).unwrap();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            records,
            vec![
                DiffRecord::new(GitStatus::Deleted, "README.md"),
                DiffRecord::new(GitStatus::Modified, "actions/foo/index.ts"),
            ]
        );

        assert_eq!(git.tags_matching("foo/v*").unwrap(), vec!["foo/v1.0.0"]);
        assert!(git.tags_matching("baz/v*").unwrap().is_empty());
        assert!(git.remote_branches_matching("*").unwrap().is_empty());
    }

    #[test]
    fn test_unknown_base_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        Git2Repo::init(dir.path()).unwrap();
        let git = Git2Repository::open(dir.path(), "origin").unwrap();
        assert!(git.diff_since("does-not-exist").is_err());
    }
}
