//! Console output for humans reading the CI log.
//!
//! Everything here prints to stderr so stdout stays parseable.

use crate::domain::VersionRef;
use console::style;
use semver::Version;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    eprintln!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    eprintln!("{} {}", style("→").yellow(), message);
}

pub fn display_warning(message: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), message);
}

/// Bulleted list of units under a bold title; `empty` when there are none.
pub fn format_unit_list(title: &str, units: &[String], empty: &str) -> String {
    let mut out = format!("{}\n", style(title).bold());
    if units.is_empty() {
        out.push_str(&format!("  {}\n", style(empty).dim()));
    }
    for unit in units {
        out.push_str(&format!("  - {}\n", unit));
    }
    out
}

pub fn display_unit_list(title: &str, units: &[String], empty: &str) {
    eprint!("{}", format_unit_list(title, units, empty));
}

/// Display the version change of a unit.
///
/// `current` is `None` for a unit that has never been released.
pub fn display_version_ref(unit: &str, current: Option<&Version>, next: &VersionRef) {
    eprintln!("\n{}", style(format!("Version of {}", unit)).bold());
    match current {
        Some(current) => {
            eprintln!("  From: {}", style(current).red());
            eprintln!("  To:   {}", style(&next.new_version).green());
        }
        None => eprintln!("  Initial: {}", style(&next.new_version).green()),
    }
    eprintln!("  Branch: {}", next.version_branch);
    eprintln!("  Tag:    {}", next.new_tag);
}
