//! Change detection
//!
//! Turns one `git diff --name-status` snapshot into the set of build units
//! a pull request affects.

pub mod aggregate;
pub mod classifier;
pub mod workflows;

pub use aggregate::{changed_directories, changed_files, ChangeAggregate};
pub use classifier::{
    action_lineages, classify_changed_actions, classify_changed_workflows, ChangedUnits,
};
pub use workflows::{workflow_uses, workflows_using_action};
