//! Optional per-unit YAML configuration.
//!
//! ```yaml
//! copy:
//!   "lib/shared/*.sh": scripts
//!   "assets/**/*.json":
//!     dest: data
//!     strip: assets/
//! changesPaths:
//!   - lib/shared/**
//! ```

use crate::error::{CiError, Result};
use crate::matcher::PathMatcher;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Destination of a `copy` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CopyTarget {
    Dest(String),
    Detailed {
        dest: String,
        #[serde(default)]
        strip: Option<String>,
    },
}

impl CopyTarget {
    pub fn dest(&self) -> &str {
        match self {
            CopyTarget::Dest(dest) => dest,
            CopyTarget::Detailed { dest, .. } => dest,
        }
    }

    /// Destination of a matched source path, relative to the staging root.
    ///
    /// With `strip`, the prefix is removed from the source path first.
    pub fn destination_for(&self, source: &str) -> String {
        let relative = match self {
            CopyTarget::Dest(_) => source,
            CopyTarget::Detailed { strip, .. } => {
                let stripped = strip
                    .as_deref()
                    .and_then(|prefix| source.strip_prefix(prefix))
                    .unwrap_or(source);
                stripped.trim_start_matches('/')
            }
        };
        let dest = self.dest().trim_end_matches('/');
        if dest.is_empty() || dest == "." {
            relative.to_string()
        } else {
            format!("{}/{}", dest, relative)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

fn deserialize_changes_paths<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<OneOrMany>::deserialize(deserializer).map(|v| v.map(Vec::from).unwrap_or_default())
}

/// Configuration of one action or workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    /// Extra files to publish: source glob (relative to the repository
    /// root) to destination.
    #[serde(default)]
    pub copy: BTreeMap<String, CopyTarget>,

    /// Additional paths whose change marks the unit as changed.
    #[serde(
        default,
        rename = "changesPaths",
        deserialize_with = "deserialize_changes_paths"
    )]
    pub changes_paths: Vec<String>,
}

impl UnitConfig {
    /// Load from `path`; a missing or empty file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(UnitConfig::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|e| {
            CiError::config(format!("invalid unit configuration {}: {}", path.display(), e))
        })
    }

    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(UnitConfig::default());
        }
        Ok(serde_yaml::from_str::<Option<UnitConfig>>(contents)?.unwrap_or_default())
    }

    /// Matcher over `changesPaths`; `None` when there are none.
    pub fn changes_matcher(&self) -> Result<Option<PathMatcher>> {
        if self.changes_paths.is_empty() {
            return Ok(None);
        }
        PathMatcher::from_rules(&self.changes_paths).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = UnitConfig::parse(
            r#"
copy:
  "lib/shared/*.sh": scripts
  "assets/**/*.json":
    dest: data
    strip: assets/
changesPaths: lib/shared/**
"#,
        )
        .unwrap();

        assert_eq!(
            config.copy["lib/shared/*.sh"],
            CopyTarget::Dest("scripts".to_string())
        );
        assert_eq!(config.copy["assets/**/*.json"].dest(), "data");
        assert_eq!(config.changes_paths, vec!["lib/shared/**"]);
    }

    #[test]
    fn test_changes_paths_list() {
        let config = UnitConfig::parse("changesPaths:\n  - a/**\n  - b.txt\n").unwrap();
        assert_eq!(config.changes_paths, vec!["a/**", "b.txt"]);
        let matcher = config.changes_matcher().unwrap().unwrap();
        assert!(matcher.is_match("a/x/y.ts"));
        assert!(matcher.is_match("b.txt"));
    }

    #[test]
    fn test_empty_and_missing() {
        assert_eq!(UnitConfig::parse("").unwrap(), UnitConfig::default());
        assert_eq!(UnitConfig::parse("~\n").unwrap(), UnitConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let config = UnitConfig::load(&dir.path().join("missing.yml")).unwrap();
        assert!(config.changes_matcher().unwrap().is_none());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(UnitConfig::parse("copyy: {}\n").is_err());
    }

    #[test]
    fn test_destination_for() {
        let plain = CopyTarget::Dest("scripts".to_string());
        assert_eq!(plain.destination_for("lib/a.sh"), "scripts/lib/a.sh");

        let stripped = CopyTarget::Detailed {
            dest: "data".to_string(),
            strip: Some("assets".to_string()),
        };
        assert_eq!(stripped.destination_for("assets/x/y.json"), "data/x/y.json");

        let root = CopyTarget::Dest(".".to_string());
        assert_eq!(root.destination_for("LICENSE"), "LICENSE");
    }
}
