use crate::error::{CiError, Result};
use std::fmt;
use std::str::FromStr;

/// Kind of a build unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitKind {
    /// A directory under the actions root
    Action,
    /// A reusable workflow file under the workflows directory
    Workflow,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Action => "action",
            UnitKind::Workflow => "workflow",
        }
    }
}

impl FromStr for UnitKind {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "action" | "actions" => Ok(UnitKind::Action),
            "workflow" | "workflows" => Ok(UnitKind::Workflow),
            other => Err(CiError::validation(format!(
                "Invalid unit kind '{}', expected action or workflow",
                other
            ))),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action or reusable workflow versioned on its own
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuildUnit {
    pub kind: UnitKind,
    pub name: String,
}

impl BuildUnit {
    /// Create a unit, rejecting names that cannot be used inside ref names.
    pub fn new(kind: UnitKind, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(CiError::validation(format!(
                "Invalid {} name '{}'",
                kind, name
            )));
        }
        Ok(BuildUnit { kind, name })
    }

    pub fn action(name: impl Into<String>) -> Result<Self> {
        Self::new(UnitKind::Action, name)
    }

    pub fn workflow(name: impl Into<String>) -> Result<Self> {
        Self::new(UnitKind::Workflow, name)
    }
}

impl fmt::Display for BuildUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!("action".parse::<UnitKind>().unwrap(), UnitKind::Action);
        assert_eq!("Workflows".parse::<UnitKind>().unwrap(), UnitKind::Workflow);
        assert!("job".parse::<UnitKind>().is_err());
    }

    #[test]
    fn test_unit_name_validation() {
        assert!(BuildUnit::action("action-foo").is_ok());
        assert!(BuildUnit::workflow("workflow-build_v2").is_ok());
        assert!(BuildUnit::action("").is_err());
        assert!(BuildUnit::action("foo/bar").is_err());
        assert!(BuildUnit::action("..").is_err());
        assert!(BuildUnit::action("a b").is_err());
    }
}
