//! External diff backends: `diff` and `git diff --no-index`.
//!
//! Both are invoked with `--unified=0` against a pair of scoped temp files
//! and their hunk headers are parsed for line counts. Exit status 0 means no
//! differences, 1 means differences; anything else is a backend failure.
//! Temp files are released on every exit path via RAII.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use tempfile::NamedTempFile;

use super::{DiffError, DiffResult, Hunk, HunkKind};

/// Which external tool to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExternalKind {
    DiffTool,
    GitTool,
}

impl ExternalKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::DiffTool => "external-diff",
            Self::GitTool => "external-git",
        }
    }
}

/// Run the external tool over one (reference, candidate) pair.
pub(super) fn run(
    kind: ExternalKind,
    program: &Path,
    reference: &[u8],
    candidate: &[u8],
) -> Result<DiffResult, DiffError> {
    let backend = kind.label();
    let failed = |detail: String| DiffError::Backend { backend, detail };

    let reference_file = write_temp(reference).map_err(&failed)?;
    let candidate_file = write_temp(candidate).map_err(&failed)?;

    let mut command = Command::new(program);
    match kind {
        ExternalKind::DiffTool => {
            command.arg("--unified=0");
        }
        ExternalKind::GitTool => {
            command.args(["diff", "--no-index", "--no-color", "--unified=0", "--"]);
        }
    }
    command.arg(reference_file.path()).arg(candidate_file.path());

    let output = command
        .output()
        .map_err(|e| failed(format!("failed to run: {e}")))?;

    match output.status.code() {
        Some(0) => Ok(DiffResult::default()),
        Some(1) => parse_unified(&output.stdout, backend),
        code => Err(failed(format!(
            "exit status {code:?}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ))),
    }
}

fn write_temp(bytes: &[u8]) -> Result<NamedTempFile, String> {
    let mut file =
        NamedTempFile::new().map_err(|e| format!("failed to create temp file: {e}"))?;
    file.write_all(bytes)
        .map_err(|e| format!("failed to write temp file: {e}"))?;
    file.flush()
        .map_err(|e| format!("failed to flush temp file: {e}"))?;
    Ok(file)
}

/// Parse `--unified=0` output: only `@@ -S[,N] +S[,N] @@` headers matter.
///
/// A missing count means 1. With zero context the header counts are exactly
/// the deleted/inserted line totals, which is the distance contract shared
/// with the internal backend. "\ No newline at end of file" markers need no
/// handling — the affected line is already counted as changed.
fn parse_unified(stdout: &[u8], backend: &'static str) -> Result<DiffResult, DiffError> {
    let mut distance: u64 = 0;
    let mut hunks = Vec::new();

    for raw in stdout.split(|b| *b == b'\n') {
        if !raw.starts_with(b"@@") {
            continue;
        }
        let line = std::str::from_utf8(raw).map_err(|_| DiffError::Backend {
            backend,
            detail: "non-UTF-8 hunk header".to_string(),
        })?;
        let malformed = || DiffError::Backend {
            backend,
            detail: format!("malformed hunk header: {line}"),
        };

        let mut tokens = line.split_whitespace();
        let _at = tokens.next().ok_or_else(malformed)?;
        let old = parse_side(tokens.next().ok_or_else(malformed)?, '-').ok_or_else(malformed)?;
        let new = parse_side(tokens.next().ok_or_else(malformed)?, '+').ok_or_else(malformed)?;

        let kind = match (old.1 > 0, new.1 > 0) {
            (true, true) => HunkKind::Replacement,
            (true, false) => HunkKind::Deletion,
            (false, true) => HunkKind::Insertion,
            (false, false) => continue,
        };
        distance += (old.1 + new.1) as u64;
        hunks.push(Hunk {
            // Unified headers are 1-based; a zero-count side already points
            // at the line before the gap.
            reference_start: old.0.saturating_sub(1),
            reference_lines: old.1,
            candidate_start: new.0.saturating_sub(1),
            candidate_lines: new.1,
            kind,
        });
    }

    Ok(DiffResult { distance, hunks })
}

/// Parse one `-S[,N]` / `+S[,N]` token into (start, count).
fn parse_side(token: &str, sign: char) -> Option<(usize, usize)> {
    let body = token.strip_prefix(sign)?;
    match body.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((body.parse().ok()?, 1)),
    }
}
