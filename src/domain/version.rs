use crate::domain::label::VersionLabel;
use crate::domain::prerelease::{PreRelease, PrereleaseChannel};
use crate::domain::tag::TagPrefix;
use crate::error::{CiError, Result};
use semver::Version;
use std::cmp::Ordering;

/// Baseline version of a unit that has never been released.
pub const BASELINE_VERSION: Version = Version::new(0, 0, 0);

/// Parse a bare semantic version (no prefix).
pub fn parse_version(s: &str) -> Result<Version> {
    Version::parse(s.trim())
        .map_err(|e| CiError::version(format!("Invalid semantic version '{}': {}", s, e)))
}

/// Semver precedence: build metadata does not take part.
pub fn compare_precedence(a: &Version, b: &Version) -> Ordering {
    a.major
        .cmp(&b.major)
        .then(a.minor.cmp(&b.minor))
        .then(a.patch.cmp(&b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// Ascending comparator.
pub fn semver_sort(a: &Version, b: &Version) -> Ordering {
    compare_precedence(a, b)
}

/// Descending comparator.
pub fn semver_sort_desc(a: &Version, b: &Version) -> Ordering {
    compare_precedence(b, a)
}

/// Latest version of a lineage, `None` when no tag has a version.
///
/// Strips `prefix` from every tag and returns the maximum under semver
/// precedence. Tags outside the prefix or not parseable as semver are
/// skipped. When two tags have the same precedence the lexically greater raw
/// tag wins, so the result never depends on input order.
pub fn latest_tagged_version<S: AsRef<str>>(tags: &[S], prefix: &TagPrefix) -> Option<Version> {
    tags.iter()
        .map(|tag| tag.as_ref())
        .filter_map(|tag| {
            let raw = prefix.strip(tag)?;
            match Version::parse(raw) {
                Ok(version) => Some((version, tag)),
                Err(e) => {
                    tracing::warn!(tag, error = %e, "skipping tag that is not a semantic version");
                    None
                }
            }
        })
        .max_by(|(a, tag_a), (b, tag_b)| compare_precedence(a, b).then_with(|| tag_a.cmp(tag_b)))
        .map(|(version, _)| version)
}

/// Like [`latest_tagged_version`], with `0.0.0` for an unreleased lineage.
pub fn latest_version<S: AsRef<str>>(tags: &[S], prefix: &TagPrefix) -> Version {
    latest_tagged_version(tags, prefix).unwrap_or(BASELINE_VERSION)
}

fn increment(n: u64) -> Result<u64> {
    n.checked_add(1)
        .ok_or_else(|| CiError::version("Version component overflow".to_string()))
}

/// Bumps a version.
///
/// - No channel, no force: regular `major`/`minor`/`patch` bump. A
///   pre-release of the target release graduates to it (`1.1.0-rc.0` +
///   minor = `1.1.0`).
/// - Channel, no force: next `major`/`minor`/`patch` release as
///   `{channel}.0` (`1.0.0` + minor + `rc` = `1.1.0-rc.0`).
/// - Force: next pre-release of the current release line (`1.1.0-rc.0` ->
///   `1.1.0-rc.1`); a plain release first moves to the next patch
///   (`1.1.0` -> `1.1.1-0`). A different channel restarts at `.0`.
///
/// Build metadata is always dropped.
pub fn bump_version(
    current: &Version,
    label: VersionLabel,
    channel: Option<&PrereleaseChannel>,
    force_prerelease_bump: bool,
) -> Result<Version> {
    let mut next = Version::new(current.major, current.minor, current.patch);
    let is_prerelease = !current.pre.is_empty();

    if force_prerelease_bump {
        if !is_prerelease {
            next.patch = increment(next.patch)?;
        }
        next.pre = PreRelease::from_semver(&current.pre).bump(channel)?.to_semver()?;
        return Ok(next);
    }

    if let Some(channel) = channel {
        match label {
            VersionLabel::Major => {
                next.major = increment(next.major)?;
                next.minor = 0;
                next.patch = 0;
            }
            VersionLabel::Minor => {
                next.minor = increment(next.minor)?;
                next.patch = 0;
            }
            VersionLabel::Patch => next.patch = increment(next.patch)?,
        }
        next.pre = PreRelease::default().bump(Some(channel))?.to_semver()?;
        return Ok(next);
    }

    match label {
        VersionLabel::Major => {
            if current.minor != 0 || current.patch != 0 || !is_prerelease {
                next.major = increment(next.major)?;
            }
            next.minor = 0;
            next.patch = 0;
        }
        VersionLabel::Minor => {
            if current.patch != 0 || !is_prerelease {
                next.minor = increment(next.minor)?;
            }
            next.patch = 0;
        }
        VersionLabel::Patch => {
            if !is_prerelease {
                next.patch = increment(next.patch)?;
            }
        }
    }
    Ok(next)
}

/// String entry point of [`bump_version`].
///
/// Fails when `current` is not a semantic version or `prerelease_prefix` is
/// not a valid channel name.
pub fn next_version(
    current: &str,
    label: VersionLabel,
    prerelease_prefix: Option<&str>,
    force_prerelease_bump: bool,
) -> Result<Version> {
    let current = parse_version(current).map_err(|e| {
        CiError::version(format!(
            "Invalid semver increase request for '{}' and label {}: {}",
            current, label, e
        ))
    })?;
    let channel = prerelease_prefix
        .map(str::parse::<PrereleaseChannel>)
        .transpose()?;
    bump_version(&current, label, channel.as_ref(), force_prerelease_bump)
}

/// New version of a unit together with the refs that publish it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRef {
    pub new_version: Version,
    /// `{unit}/v{major}`
    pub version_branch: String,
    /// `{unit}/v{new_version}`
    pub new_tag: String,
}

impl VersionRef {
    pub fn for_version(unit: &str, new_version: Version) -> Self {
        let prefix = TagPrefix::for_unit(unit);
        VersionRef {
            version_branch: prefix.branch(new_version.major),
            new_tag: prefix.tag(&new_version),
            new_version,
        }
    }
}

/// Next [`VersionRef`] of a unit currently at `current`.
pub fn version_ref(unit: &str, current: &Version, label: VersionLabel) -> Result<VersionRef> {
    let new_version = bump_version(current, label, None, false)?;
    Ok(VersionRef::for_version(unit, new_version))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_plain_bumps_reset_lower_components() {
        let current = v("1.2.3");
        assert_eq!(
            bump_version(&current, VersionLabel::Major, None, false).unwrap(),
            v("2.0.0")
        );
        assert_eq!(
            bump_version(&current, VersionLabel::Minor, None, false).unwrap(),
            v("1.3.0")
        );
        assert_eq!(
            bump_version(&current, VersionLabel::Patch, None, false).unwrap(),
            v("1.2.4")
        );
    }

    #[test]
    fn test_prerelease_graduates() {
        assert_eq!(
            bump_version(&v("2.0.0-rc.3"), VersionLabel::Major, None, false).unwrap(),
            v("2.0.0")
        );
        assert_eq!(
            bump_version(&v("1.2.4-rc.0"), VersionLabel::Patch, None, false).unwrap(),
            v("1.2.4")
        );
        // Not a pre-release of a minor release
        assert_eq!(
            bump_version(&v("1.2.4-rc.0"), VersionLabel::Minor, None, false).unwrap(),
            v("1.3.0")
        );
    }

    #[test]
    fn test_build_metadata_dropped() {
        assert_eq!(
            bump_version(&v("1.0.0+build.5"), VersionLabel::Patch, None, false).unwrap(),
            v("1.0.1")
        );
    }

    #[test]
    fn test_baseline_release() {
        let r = version_ref("action-foo", &BASELINE_VERSION, VersionLabel::Patch).unwrap();
        assert_eq!(r.new_version, v("0.0.1"));
        assert_eq!(r.version_branch, "action-foo/v0");
        assert_eq!(r.new_tag, "action-foo/v0.0.1");
    }

    #[test]
    fn test_unparsable_tags_are_not_a_release() {
        let prefix = TagPrefix::for_unit("foo");
        assert_eq!(latest_tagged_version(&["foo/vnext", "foo/v1"], &prefix), None);
        assert_eq!(
            latest_tagged_version(&["foo/vnext", "foo/v0.0.0"], &prefix),
            Some(BASELINE_VERSION)
        );
        assert_eq!(latest_version(&["foo/vnext"], &prefix), BASELINE_VERSION);
    }

    #[test]
    fn test_next_version_rejects_malformed_input() {
        assert!(next_version("1.0", VersionLabel::Minor, None, false).is_err());
        assert!(next_version("v1.0.0", VersionLabel::Minor, None, false).is_err());
        assert!(next_version("1.0.0", VersionLabel::Minor, Some("bad_prefix"), false).is_err());
    }
}
