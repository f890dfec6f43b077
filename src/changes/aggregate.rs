use crate::git::DiffRecord;
use crate::matcher::PathMatcher;
use std::collections::BTreeMap;

/// Changed keys (files or directories), each flagged with whether any
/// contributing record was not a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeAggregate {
    entries: BTreeMap<String, bool>,
}

impl ChangeAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Once a key has a non-deletion change it keeps it.
    pub fn record(&mut self, key: impl Into<String>, is_deletion: bool) {
        let flag = self.entries.entry(key.into()).or_insert(false);
        *flag |= !is_deletion;
    }

    /// `Some(true)` if the key has at least one non-deletion change.
    pub fn has_non_deletion(&self, key: &str) -> Option<bool> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted keys, dropping keys whose changes are all deletions when
    /// `ignore_all_deletions` is set.
    pub fn keys(&self, ignore_all_deletions: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, non_deletion)| !ignore_all_deletions || **non_deletion)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

/// Parent directory of `path` cut to its first `max_depth + 1` components.
/// Files at the root belong to `.`.
fn directory_key(path: &str, max_depth: usize) -> String {
    let parent = match path.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => parent,
        _ => return ".".to_string(),
    };
    parent
        .split('/')
        .take(max_depth + 1)
        .collect::<Vec<_>>()
        .join("/")
}

/// Changed files matching `matcher`.
pub fn changed_files(
    records: &[DiffRecord],
    matcher: &PathMatcher,
    ignore_deletions: bool,
) -> Vec<String> {
    let mut aggregate = ChangeAggregate::new();
    for record in records.iter().filter(|r| matcher.is_match(&r.path)) {
        aggregate.record(record.path.as_str(), record.is_deletion());
    }
    aggregate.keys(ignore_deletions)
}

/// Changed directories of files matching `matcher`.
///
/// `max_depth = 0` keeps the first path component, `1` the first two, and
/// so on.
pub fn changed_directories(
    records: &[DiffRecord],
    matcher: &PathMatcher,
    max_depth: usize,
    ignore_if_all_deletions: bool,
) -> Vec<String> {
    let mut aggregate = ChangeAggregate::new();
    for record in records.iter().filter(|r| matcher.is_match(&r.path)) {
        aggregate.record(directory_key(&record.path, max_depth), record.is_deletion());
    }
    aggregate.keys(ignore_if_all_deletions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitStatus;

    fn records() -> Vec<DiffRecord> {
        vec![
            DiffRecord::new(GitStatus::Modified, "actions/foo/index.ts"),
            DiffRecord::new(GitStatus::Deleted, "actions/foo/old.ts"),
            DiffRecord::new(GitStatus::Deleted, "actions/bar/index.ts"),
            DiffRecord::new(GitStatus::Deleted, "actions/bar/action.yml"),
            DiffRecord::new(GitStatus::Added, "actions/baz/src/deep/file.ts"),
            DiffRecord::new(GitStatus::Modified, "README.md"),
        ]
    }

    #[test]
    fn test_or_reduction() {
        let mut aggregate = ChangeAggregate::new();
        aggregate.record("a", false);
        aggregate.record("a", true);
        aggregate.record("b", true);
        assert_eq!(aggregate.has_non_deletion("a"), Some(true));
        assert_eq!(aggregate.has_non_deletion("b"), Some(false));
        assert_eq!(aggregate.has_non_deletion("c"), None);
        assert_eq!(aggregate.keys(true), vec!["a"]);
        assert_eq!(aggregate.keys(false), vec!["a", "b"]);
    }

    #[test]
    fn test_changed_directories_depth() {
        let matcher = PathMatcher::from_regex("^actions/").unwrap();
        assert_eq!(
            changed_directories(&records(), &matcher, 1, true),
            vec!["actions/baz", "actions/foo"]
        );
        assert_eq!(
            changed_directories(&records(), &matcher, 1, false),
            vec!["actions/bar", "actions/baz", "actions/foo"]
        );
        assert_eq!(
            changed_directories(&records(), &matcher, 0, true),
            vec!["actions"]
        );
    }

    #[test]
    fn test_root_files_belong_to_dot() {
        let all = PathMatcher::any();
        let dirs = changed_directories(&records(), &all, 0, true);
        assert!(dirs.contains(&".".to_string()));
    }

    #[test]
    fn test_changed_files() {
        let matcher = PathMatcher::from_regex(r"\.ts$").unwrap();
        assert_eq!(
            changed_files(&records(), &matcher, true),
            vec!["actions/baz/src/deep/file.ts", "actions/foo/index.ts"]
        );
        assert_eq!(changed_files(&records(), &matcher, false).len(), 4);
    }
}
