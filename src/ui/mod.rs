//! User interface module - console formatting of command results.

pub mod formatter;

pub use formatter::{
    display_error, display_status, display_success, display_unit_list, display_version_ref,
    display_warning, format_unit_list,
};
