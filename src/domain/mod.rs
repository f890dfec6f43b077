//! Domain logic - pure versioning and naming rules independent of git

pub mod branch;
pub mod label;
pub mod prerelease;
pub mod tag;
pub mod unit;
pub mod version;

pub use branch::{dev_branch_glob, dev_branch_matches, dev_branch_name, pr_suffix};
pub use label::{find_release_label, resolve_release_label, ReleaseLabel, VersionLabel};
pub use prerelease::{PreRelease, PrereleaseChannel};
pub use tag::{latest_major_branch, TagPrefix};
pub use unit::{BuildUnit, UnitKind};
pub use version::{
    bump_version, latest_tagged_version, latest_version, next_version, version_ref, VersionRef,
    BASELINE_VERSION,
};
