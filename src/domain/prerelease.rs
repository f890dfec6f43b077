//! Pre-release handling for semantic versioning
//!
//! A pre-release is a dot-separated list of identifiers (`rc.1`, `0`,
//! `myprefix.3`). Channels are the leading alphanumeric identifier.
//! According to semver.org: https://semver.org/#spec-item-9

use crate::error::{CiError, Result};
use std::fmt;
use std::str::FromStr;

/// Name of a pre-release channel (e.g. `rc`, `beta`, `my-prefix`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrereleaseChannel(String);

impl PrereleaseChannel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PrereleaseChannel {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(CiError::version("Empty pre-release channel"));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(CiError::version(format!(
                "Invalid pre-release channel: '{}'",
                s
            )));
        }
        Ok(PrereleaseChannel(s.to_string()))
    }
}

impl fmt::Display for PrereleaseChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One dot-separated pre-release identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Numeric(u64),
    AlphaNumeric(String),
}

impl Identifier {
    fn parse(s: &str) -> Self {
        match s.parse::<u64>() {
            Ok(n) if s.chars().all(|c| c.is_ascii_digit()) => Identifier::Numeric(n),
            _ => Identifier::AlphaNumeric(s.to_string()),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Numeric(n) => write!(f, "{}", n),
            Identifier::AlphaNumeric(s) => f.write_str(s),
        }
    }
}

/// Pre-release component of a version, as an editable identifier list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreRelease {
    pub identifiers: Vec<Identifier>,
}

impl PreRelease {
    pub fn from_semver(pre: &semver::Prerelease) -> Self {
        if pre.is_empty() {
            return PreRelease::default();
        }
        PreRelease {
            identifiers: pre.as_str().split('.').map(Identifier::parse).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// The leading alphanumeric identifier, if any.
    pub fn channel(&self) -> Option<&str> {
        match self.identifiers.first() {
            Some(Identifier::AlphaNumeric(s)) => Some(s),
            _ => None,
        }
    }

    /// Next pre-release of the same release.
    ///
    /// Increments the last numeric identifier (appending `0` if there is
    /// none; an empty pre-release becomes `0`). When `channel` is given and
    /// differs from the current channel, or the channel carries no ordinal,
    /// the result restarts at `{channel}.0`.
    ///
    /// # Examples
    /// ```ignore
    /// // rc.0 -> rc.1
    /// // rc.0 with channel "beta" -> beta.0
    /// // (empty) -> 0
    /// ```
    pub fn bump(&self, channel: Option<&PrereleaseChannel>) -> Result<Self> {
        let mut identifiers = self.identifiers.clone();

        if identifiers.is_empty() {
            identifiers.push(Identifier::Numeric(0));
        } else {
            let last_numeric = identifiers.iter_mut().rev().find_map(|id| match id {
                Identifier::Numeric(n) => Some(n),
                Identifier::AlphaNumeric(_) => None,
            });
            match last_numeric {
                Some(n) => {
                    *n = n.checked_add(1).ok_or_else(|| {
                        CiError::version("Pre-release ordinal overflow".to_string())
                    })?;
                }
                None => identifiers.push(Identifier::Numeric(0)),
            }
        }

        if let Some(channel) = channel {
            let keeps_channel = matches!(
                (identifiers.first(), identifiers.get(1)),
                (Some(Identifier::AlphaNumeric(first)), Some(Identifier::Numeric(_)))
                    if first == channel.as_str()
            );
            if !keeps_channel {
                identifiers = vec![
                    Identifier::AlphaNumeric(channel.as_str().to_string()),
                    Identifier::Numeric(0),
                ];
            }
        }

        Ok(PreRelease { identifiers })
    }

    pub fn to_semver(&self) -> Result<semver::Prerelease> {
        semver::Prerelease::new(&self.to_string()).map_err(|e| {
            CiError::version(format!("Invalid pre-release '{}': {}", self, e))
        })
    }
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.identifiers.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}
