//! Internal line-diff backend.
//!
//! Always available; used directly when selected and as the retry target
//! when an external backend process fails. Distances follow the documented
//! counting rule exactly: inserted lines + deleted lines, a replacement
//! counting both sides, trailing-newline presence significant (a line with
//! and without its terminator is a changed line).

use similar::{DiffTag, TextDiff};

use super::{DiffResult, Hunk, HunkKind};

/// Diff `candidate` against `reference` line by line.
#[must_use]
pub fn line_diff(reference: &[u8], candidate: &[u8]) -> DiffResult {
    let diff = TextDiff::from_lines(reference, candidate);

    let mut distance: u64 = 0;
    let mut hunks = Vec::new();
    for op in diff.ops() {
        let old = op.old_range();
        let new = op.new_range();
        let kind = match op.tag() {
            DiffTag::Equal => continue,
            DiffTag::Delete => HunkKind::Deletion,
            DiffTag::Insert => HunkKind::Insertion,
            DiffTag::Replace => HunkKind::Replacement,
        };
        distance += (old.len() + new.len()) as u64;
        hunks.push(Hunk {
            reference_start: old.start,
            reference_lines: old.len(),
            candidate_start: new.start,
            candidate_lines: new.len(),
            kind,
        });
    }

    DiffResult { distance, hunks }
}
