//! Partition a raw branch listing into `main` and `feature` groups.

use super::BranchGroup;

/// Long-lived branches shown in the `main` group.
pub const MAIN_BRANCHES: [&str; 4] = ["main", "master", "staging", "production"];

/// Branches hidden from both groups.
pub const EXCLUDED_BRANCHES: [&str; 1] = ["master"];

/// Categorizes `raw` with the default exclusion list.
#[must_use]
pub fn categorize<S: AsRef<str>>(raw: &[S]) -> BranchGroup {
    categorize_with(raw, &EXCLUDED_BRANCHES)
}

/// Drops excluded names, then routes [`MAIN_BRANCHES`] to `main` and
/// everything else to `feature`, keeping the input order in each group.
#[must_use]
pub fn categorize_with<S: AsRef<str>>(raw: &[S], excluded: &[&str]) -> BranchGroup {
    let mut group = BranchGroup::default();
    for name in raw.iter().map(AsRef::as_ref) {
        if name.is_empty() || excluded.contains(&name) {
            continue;
        }
        if MAIN_BRANCHES.contains(&name) {
            group.main.push(name.to_string());
        } else {
            group.feature.push(name.to_string());
        }
    }
    group
}
