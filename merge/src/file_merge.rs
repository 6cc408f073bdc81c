//! File-level three-way merge: the per-file decision tree that decides
//! whether a file is unchanged, changed on one side only, changed
//! identically on both sides, or genuinely conflicting.

use crate::line_merge::LineMerger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    Ours,
    Theirs,
    Manual,
}

/// Records which rule fired for a file, for `--verbose` reporting and
/// tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeReason {
    Unchanged,
    CurrentOnlyChange,
    OtherOnlyChange,
    BothChangedEqual,
    BothChangedConflict,
    ResolvedOurs,
    ResolvedTheirs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMergeResult {
    pub content: Vec<u8>,
    pub conflict: bool,
    pub reason: MergeReason,
}

/// One path's merge result as part of a whole-component merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedFile {
    pub path: String,
    pub result: FileMergeResult,
}

/// Per-component merge output: `{files[], hasConflicts}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub files: Vec<MergedFile>,
    pub has_conflicts: bool,
}

/// Merge every file present on either side of a component's three file
/// sets (base/current/other), keyed by relative path.
pub fn merge_component_files<'a>(
    paths: impl IntoIterator<Item = &'a str>,
    mut base: impl FnMut(&str) -> Option<&'a [u8]>,
    mut current: impl FnMut(&str) -> Option<&'a [u8]>,
    mut other: impl FnMut(&str) -> Option<&'a [u8]>,
    strategy: Option<MergeStrategy>,
    line_merger: &dyn LineMerger,
) -> MergeOutcome {
    let mut files = Vec::new();
    let mut has_conflicts = false;

    for path in paths {
        let result = merge_file(
            base(path),
            current(path).unwrap_or(&[]),
            other(path).unwrap_or(&[]),
            strategy,
            line_merger,
        );
        has_conflicts |= result.conflict;
        files.push(MergedFile {
            path: path.to_string(),
            result,
        });
    }

    MergeOutcome {
        files,
        has_conflicts,
    }
}

/// Merge one file's three revisions. `base` is `None` when the file has no
/// prior version to compare against (e.g. it's new on both sides).
///
/// When `strategy` is `Some(Ours)`/`Some(Theirs)`, a real conflict is
/// resolved by picking that side outright rather than invoking
/// `line_merger`.
pub fn merge_file(
    base: Option<&[u8]>,
    current: &[u8],
    other: &[u8],
    strategy: Option<MergeStrategy>,
    line_merger: &dyn LineMerger,
) -> FileMergeResult {
    let current_matches_base = base.map(|b| b == current).unwrap_or(false);
    let other_matches_base = base.map(|b| b == other).unwrap_or(false);

    if current_matches_base {
        return FileMergeResult {
            content: other.to_vec(),
            conflict: false,
            reason: MergeReason::Unchanged,
        };
    }

    if other_matches_base {
        return FileMergeResult {
            content: current.to_vec(),
            conflict: false,
            reason: MergeReason::CurrentOnlyChange,
        };
    }

    if current == other {
        return FileMergeResult {
            content: current.to_vec(),
            conflict: false,
            reason: MergeReason::BothChangedEqual,
        };
    }

    match strategy {
        Some(MergeStrategy::Ours) => FileMergeResult {
            content: current.to_vec(),
            conflict: false,
            reason: MergeReason::ResolvedOurs,
        },
        Some(MergeStrategy::Theirs) => FileMergeResult {
            content: other.to_vec(),
            conflict: false,
            reason: MergeReason::ResolvedTheirs,
        },
        Some(MergeStrategy::Manual) | None => {
            let base_bytes = base.unwrap_or(&[]);
            let result = line_merger.merge(base_bytes, current, other);
            FileMergeResult {
                content: result.text,
                conflict: result.conflict,
                reason: MergeReason::BothChangedConflict,
            }
        }
    }
}
