//! CI flows, one per `gha-ci` command.
//!
//! Each flow takes a plain argument struct (no clap types), the
//! [Workspace] and its collaborators, and writes step outputs through
//! [Outputs]. The binary only parses arguments and wires collaborators.

pub mod changes;
pub mod cleanup;
pub mod release;
pub mod testing;

pub use changes::{changed_dirs, changes, ChangedDirsArgs, ChangesArgs};
pub use cleanup::{cleanup, CleanupArgs, CleanupReport};
pub use release::{
    publish, release_label, version, PublishArgs, ReleaseLabelArgs, VersionArgs,
};
pub use testing::{report_test, trigger_tests, ReportTestArgs, TriggerTestsArgs};

use serde::Serialize;

/// Job matrix handed to `strategy.matrix` with `fromJSON`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Matrix<'a> {
    pub directory: &'a [String],
}

impl<'a> Matrix<'a> {
    pub fn new(directory: &'a [String]) -> Self {
        Matrix { directory }
    }
}
