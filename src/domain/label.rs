use crate::error::{CiError, Result};
use std::fmt;
use std::str::FromStr;

pub const NO_RELEASE_LABEL: &str = "no-release";

/// Size of the semver bump selected by a pull request label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionLabel {
    Patch,
    Minor,
    Major,
}

impl VersionLabel {
    /// All labels, lowest precedence first.
    pub const ALL: [VersionLabel; 3] = [VersionLabel::Patch, VersionLabel::Minor, VersionLabel::Major];

    pub fn as_str(&self) -> &'static str {
        match self {
            VersionLabel::Patch => "patch",
            VersionLabel::Minor => "minor",
            VersionLabel::Major => "major",
        }
    }
}

impl FromStr for VersionLabel {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "patch" => Ok(VersionLabel::Patch),
            "minor" => Ok(VersionLabel::Minor),
            "major" => Ok(VersionLabel::Major),
            other => Err(CiError::validation(format!(
                "Invalid version label '{}', expected one of patch, minor, major",
                other
            ))),
        }
    }
}

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Release decision carried by a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReleaseLabel {
    Release(VersionLabel),
    NoRelease,
}

impl ReleaseLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseLabel::Release(label) => label.as_str(),
            ReleaseLabel::NoRelease => NO_RELEASE_LABEL,
        }
    }

    pub fn version_label(&self) -> Option<VersionLabel> {
        match self {
            ReleaseLabel::Release(label) => Some(*label),
            ReleaseLabel::NoRelease => None,
        }
    }
}

impl FromStr for ReleaseLabel {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim() == NO_RELEASE_LABEL {
            return Ok(ReleaseLabel::NoRelease);
        }
        s.parse::<VersionLabel>()
            .map(ReleaseLabel::Release)
            .map_err(|_| {
                CiError::validation(format!(
                    "Invalid release label '{}', expected one of {}",
                    s,
                    accepted_labels()
                ))
            })
    }
}

impl fmt::Display for ReleaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comma-separated list of every recognized label.
pub fn accepted_labels() -> String {
    VersionLabel::ALL
        .iter()
        .map(VersionLabel::as_str)
        .chain(std::iter::once(NO_RELEASE_LABEL))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the release label out of a pull request's labels.
///
/// `no-release` wins over everything; otherwise major > minor > patch.
/// Unrecognized labels are ignored.
pub fn find_release_label<S: AsRef<str>>(labels: &[S]) -> Option<ReleaseLabel> {
    if labels.iter().any(|l| l.as_ref() == NO_RELEASE_LABEL) {
        return Some(ReleaseLabel::NoRelease);
    }

    labels
        .iter()
        .filter_map(|l| l.as_ref().parse::<VersionLabel>().ok())
        .max()
        .map(ReleaseLabel::Release)
}

/// Like [`find_release_label`], but a pull request without any recognized
/// label is an error unless `tolerate_missing` is set.
pub fn resolve_release_label<S: AsRef<str>>(
    labels: &[S],
    tolerate_missing: bool,
) -> Result<Option<ReleaseLabel>> {
    match find_release_label(labels) {
        Some(label) => Ok(Some(label)),
        None if tolerate_missing => Ok(None),
        None => Err(CiError::MissingReleaseLabel(accepted_labels())),
    }
}
