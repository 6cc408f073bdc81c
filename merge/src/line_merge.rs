//! A `merge(1)`-compatible three-way line merger: given `base`, `ours`, and
//! `theirs`, produces either the clean merged text or diff3-style conflict
//! markers, using the classic "align both diffs against the shared base"
//! technique.

use std::ops::Range;

use similar::{ChangeTag, TextDiff};

pub struct LineMergeResult {
    pub text: Vec<u8>,
    pub conflict: bool,
}

/// The external line-merge capability. The default implementation below
/// has the same contract as UNIX `merge(1)`; callers needing an actual
/// external `merge(1)` binary can swap in their own implementation of
/// this trait.
pub trait LineMerger: Send + Sync {
    fn merge(&self, base: &[u8], ours: &[u8], theirs: &[u8]) -> LineMergeResult;
}

#[derive(Default)]
pub struct Diff3LineMerger;

struct Hunk {
    base_range: Range<usize>,
    replacement: Vec<String>,
}

fn lines_of(text: &str) -> Vec<String> {
    // Keep line terminators as part of each line so joining hunks back
    // together reproduces the original text exactly when unchanged.
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(pos) = rest.find('\n') {
            lines.push(rest[..=pos].to_string());
            rest = &rest[pos + 1..];
        } else {
            lines.push(rest.to_string());
            rest = "";
        }
    }
    lines
}

/// Hunks of `side` relative to `base`, in ascending base-index order and
/// non-overlapping (each describes one maximal run of inserted/replaced/
/// deleted lines).
fn hunks_against_base(base_lines: &[String], side_lines: &[String]) -> Vec<Hunk> {
    let base_joined = base_lines.concat();
    let side_joined = side_lines.concat();
    let diff = TextDiff::from_lines(&base_joined, &side_joined);

    let mut hunks = Vec::new();
    for op in diff.ops() {
        match op.tag() {
            ChangeTag::Equal => continue,
            _ => {
                let old_range = op.old_range();
                let new_range = op.new_range();
                hunks.push(Hunk {
                    base_range: old_range,
                    replacement: side_lines[new_range].to_vec(),
                });
            }
        }
    }
    hunks
}

impl LineMerger for Diff3LineMerger {
    fn merge(&self, base: &[u8], ours: &[u8], theirs: &[u8]) -> LineMergeResult {
        let base_str = String::from_utf8_lossy(base);
        let ours_str = String::from_utf8_lossy(ours);
        let theirs_str = String::from_utf8_lossy(theirs);

        let base_lines = lines_of(&base_str);
        let ours_lines = lines_of(&ours_str);
        let theirs_lines = lines_of(&theirs_str);

        let ours_hunks = hunks_against_base(&base_lines, &ours_lines);
        let theirs_hunks = hunks_against_base(&base_lines, &theirs_lines);

        let (merged_lines, conflict) =
            merge_hunks(&base_lines, &ours_hunks, &theirs_hunks);

        LineMergeResult {
            text: merged_lines.concat().into_bytes(),
            conflict,
        }
    }
}

fn merge_hunks(
    base_lines: &[String],
    ours_hunks: &[Hunk],
    theirs_hunks: &[Hunk],
) -> (Vec<String>, bool) {
    let mut out = Vec::new();
    let mut conflict = false;
    let mut cursor = 0usize;
    let mut oi = 0usize;
    let mut ti = 0usize;

    while cursor < base_lines.len() || oi < ours_hunks.len() || ti < theirs_hunks.len() {
        let next_o = ours_hunks.get(oi);
        let next_t = theirs_hunks.get(ti);

        let next_start = match (next_o, next_t) {
            (Some(o), Some(t)) => o.base_range.start.min(t.base_range.start),
            (Some(o), None) => o.base_range.start,
            (None, Some(t)) => t.base_range.start,
            (None, None) => base_lines.len(),
        };

        if cursor < next_start {
            out.extend(base_lines[cursor..next_start].iter().cloned());
            cursor = next_start;
            continue;
        }

        let o_here = next_o.filter(|o| o.base_range.start == cursor);
        let t_here = next_t.filter(|t| t.base_range.start == cursor);

        match (o_here, t_here) {
            (Some(o), None) => {
                out.extend(o.replacement.iter().cloned());
                cursor = o.base_range.end.max(cursor + 1);
                oi += 1;
            }
            (None, Some(t)) => {
                out.extend(t.replacement.iter().cloned());
                cursor = t.base_range.end.max(cursor + 1);
                ti += 1;
            }
            (Some(o), Some(t)) => {
                if o.replacement == t.replacement && o.base_range.end == t.base_range.end {
                    out.extend(o.replacement.iter().cloned());
                } else {
                    conflict = true;
                    out.push("<<<<<<< ours\n".to_string());
                    out.extend(o.replacement.iter().cloned());
                    out.push("=======\n".to_string());
                    out.extend(t.replacement.iter().cloned());
                    out.push(">>>>>>> theirs\n".to_string());
                }
                cursor = o.base_range.end.max(t.base_range.end).max(cursor + 1);
                oi += 1;
                ti += 1;
            }
            (None, None) => unreachable!("next_start computed from one of the two hunk lists"),
        }
    }

    (out, conflict)
}
