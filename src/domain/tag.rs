use regex::Regex;
use semver::Version;

/// Tag and version-branch naming of one build unit: `{unit}/v`.
///
/// Tags are `{unit}/v{semver}`, major version branches `{unit}/v{major}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPrefix {
    prefix: String,
}

impl TagPrefix {
    pub fn for_unit(unit: &str) -> Self {
        TagPrefix {
            prefix: format!("{}/v", unit),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Glob listing the whole lineage of the unit (tags or branches).
    pub fn glob(&self) -> String {
        format!("{}*", self.prefix)
    }

    /// Example: prefix="foo/v", version=1.2.3 -> "foo/v1.2.3"
    pub fn tag(&self, version: &Version) -> String {
        format!("{}{}", self.prefix, version)
    }

    pub fn branch(&self, major: u64) -> String {
        format!("{}{}", self.prefix, major)
    }

    /// Version part of a tag of this lineage.
    pub fn strip<'a>(&self, tag: &'a str) -> Option<&'a str> {
        tag.strip_prefix(self.prefix.as_str())
    }
}

/// Highest major version among `{unit}/v{N}` branch names.
///
/// Names that are not major version branches (full tags, dev branches) are
/// ignored. Returns `None` when the unit has never been released.
pub fn latest_major_branch<S: AsRef<str>>(branches: &[S]) -> Option<u64> {
    let re = Regex::new(r"/v(\d+)$").ok()?;
    branches
        .iter()
        .filter_map(|b| re.captures(b.as_ref()))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
}
