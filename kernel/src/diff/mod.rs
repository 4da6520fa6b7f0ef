//! The line-oriented diff metric.
//!
//! Reduces a (reference, candidate) byte pair to a non-negative distance —
//! the count of inserted plus deleted lines, with a replacement counting one
//! of each — and a hunk list with positional information for side-by-side
//! rendering. Trailing-newline presence is significant.
//!
//! Three backends produce the metric: an external `diff` tool, an external
//! `git diff --no-index`, and an internal line diff. All report identical
//! distances for identical inputs; only hunk boundaries may vary. The
//! backend is chosen once at startup ([`probe::select_backend`]) and frozen
//! for the run so distances stay comparable across candidates; an external
//! backend that fails mid-run falls back to the internal metric for that
//! pair.

use std::path::PathBuf;

use thiserror::Error;

mod external;
mod internal;
mod probe;

pub use probe::select_backend;

/// The result of diffing one (reference, candidate) pair.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffResult {
    /// Inserted plus deleted lines.
    pub distance: u64,
    /// Changed regions in pair order.
    pub hunks: Vec<Hunk>,
}

/// A changed region: line ranges on both sides plus a classification.
///
/// Starts are zero-based line indices; a zero-length side marks the
/// insertion point for a pure insertion or deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hunk {
    pub reference_start: usize,
    pub reference_lines: usize,
    pub candidate_start: usize,
    pub candidate_lines: usize,
    pub kind: HunkKind,
}

/// Classification of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HunkKind {
    /// Lines present only in the candidate.
    Insertion,
    /// Lines present only in the reference.
    Deletion,
    /// Lines differing on both sides.
    Replacement,
}

/// Typed failure for diff backends.
#[derive(Debug, Error)]
pub enum DiffError {
    /// An external backend process failed (spawn error, bad exit, unparsable
    /// output).
    #[error("diff backend `{backend}` failed: {detail}")]
    Backend {
        backend: &'static str,
        detail: String,
    },

    /// The requested backend cannot be used on this host.
    #[error("diff backend `{name}` is unavailable: {detail}")]
    Unavailable {
        name: &'static str,
        detail: String,
    },
}

/// Caller-requested backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendChoice {
    /// Probe `diff`, then `git`, then fall back to the internal metric.
    #[default]
    Auto,
    ExternalDiff,
    ExternalGit,
    Internal,
}

#[derive(Debug, Clone)]
enum BackendKind {
    ExternalDiff { program: PathBuf },
    ExternalGit { program: PathBuf },
    Internal,
}

/// A frozen diff backend. Built once by [`select_backend`] and threaded
/// through the evaluator as an immutable value.
#[derive(Debug, Clone)]
pub struct DiffBackend {
    kind: BackendKind,
}

impl DiffBackend {
    /// The always-available internal backend.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            kind: BackendKind::Internal,
        }
    }

    /// Stable label for logs and the search-log metadata.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match &self.kind {
            BackendKind::ExternalDiff { .. } => "external-diff",
            BackendKind::ExternalGit { .. } => "external-git",
            BackendKind::Internal => "internal",
        }
    }

    /// Diff `candidate` against `reference`.
    ///
    /// External backend process failure retries on the internal fallback,
    /// which cannot fail; distances are backend-equivalent by contract, so
    /// the fallback never skews a comparison.
    #[must_use]
    pub fn measure(&self, reference: &[u8], candidate: &[u8]) -> DiffResult {
        let attempt = match &self.kind {
            BackendKind::Internal => return internal::line_diff(reference, candidate),
            BackendKind::ExternalDiff { program } => {
                external::run(external::ExternalKind::DiffTool, program, reference, candidate)
            }
            BackendKind::ExternalGit { program } => {
                external::run(external::ExternalKind::GitTool, program, reference, candidate)
            }
        };
        match attempt {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(
                    backend = self.label(),
                    %error,
                    "external diff backend failed; retrying on the internal metric"
                );
                internal::line_diff(reference, candidate)
            }
        }
    }
}

/// Split bytes into lines, each including its terminator (the final line may
/// lack one). Mirrors the line segmentation the metric counts on.
#[must_use]
pub fn split_lines(bytes: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'\n' {
            lines.push(&bytes[start..=i]);
            start = i + 1;
        }
    }
    if start < bytes.len() {
        lines.push(&bytes[start..]);
    }
    lines
}
