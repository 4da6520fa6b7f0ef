//! Startup backend selection.
//!
//! The backend is probed once — binary discovery plus a self-test on a pair
//! with a known distance — and frozen for the whole run, so every candidate
//! is scored by the same metric. Auto mode prefers `diff`, then `git`, then
//! the internal fallback.

use super::external::{run, ExternalKind};
use super::{BackendChoice, BackendKind, DiffBackend, DiffError};

const PROBE_REFERENCE: &[u8] = b"alpha\nbravo\ncharlie\n";
const PROBE_CANDIDATE: &[u8] = b"alpha\nbravo\ndelta\n";
const PROBE_DISTANCE: u64 = 2;

/// Resolve the caller's backend choice to a frozen [`DiffBackend`].
///
/// # Errors
///
/// Returns [`DiffError::Unavailable`] when an explicitly requested external
/// backend cannot be located or fails its self-test. Auto mode and the
/// internal backend never fail.
pub fn select_backend(choice: BackendChoice) -> Result<DiffBackend, DiffError> {
    let backend = match choice {
        BackendChoice::Internal => DiffBackend::internal(),
        BackendChoice::ExternalDiff => probe_external(ExternalKind::DiffTool, "diff")?,
        BackendChoice::ExternalGit => probe_external(ExternalKind::GitTool, "git")?,
        BackendChoice::Auto => probe_external(ExternalKind::DiffTool, "diff")
            .or_else(|_| probe_external(ExternalKind::GitTool, "git"))
            .unwrap_or_else(|_| DiffBackend::internal()),
    };
    tracing::info!(backend = backend.label(), "diff backend selected");
    Ok(backend)
}

fn probe_external(kind: ExternalKind, binary: &str) -> Result<DiffBackend, DiffError> {
    let name = kind.label();
    let program = which::which(binary).map_err(|e| DiffError::Unavailable {
        name,
        detail: e.to_string(),
    })?;

    // Self-test: the tool must support the invocation flags and report the
    // documented distance on a known pair.
    let result =
        run(kind, &program, PROBE_REFERENCE, PROBE_CANDIDATE).map_err(|e| DiffError::Unavailable {
            name,
            detail: format!("probe run failed: {e}"),
        })?;
    if result.distance != PROBE_DISTANCE {
        return Err(DiffError::Unavailable {
            name,
            detail: format!(
                "probe distance mismatch: expected {PROBE_DISTANCE}, got {}",
                result.distance
            ),
        });
    }

    let kind = match kind {
        ExternalKind::DiffTool => BackendKind::ExternalDiff { program },
        ExternalKind::GitTool => BackendKind::ExternalGit { program },
    };
    Ok(DiffBackend { kind })
}
