//! Per-pull-request development branch naming

use glob::Pattern;

/// Suffix identifying a pull request in ref names: `pr-{n}`
pub fn pr_suffix(pull_number: u64) -> String {
    format!("pr-{}", pull_number)
}

/// Dev branch of one unit for one pull request: `{unit}/dev-pr-{n}`
pub fn dev_branch_name(unit: &str, pull_number: u64) -> String {
    format!("{}/dev-{}", unit, pr_suffix(pull_number))
}

/// Glob matching the dev branches of every unit for one pull request.
pub fn dev_branch_glob(pull_number: u64) -> String {
    format!("*/dev-{}", pr_suffix(pull_number))
}

/// True if `branch` is a dev branch of `pull_number`, using the same glob
/// the cleanup flow hands to git.
pub fn dev_branch_matches(branch: &str, pull_number: u64) -> bool {
    Pattern::new(&dev_branch_glob(pull_number))
        .map(|p| p.matches(branch))
        .unwrap_or(false)
}
