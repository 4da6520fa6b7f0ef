//! Formatter adapters.
//!
//! Each adapter is an independent implementation of the search-facing
//! [`Formatter`](stylefit_search::contract::Formatter) contract: option
//! table, base styles, subprocess invocation, native style rendering. The
//! `fixture` adapter is a pure in-process formatter used by the lock tests
//! and benchmarks.

use std::sync::Arc;
use std::time::Duration;

use stylefit_search::contract::Formatter;
use thiserror::Error;

pub mod clang_format;
pub mod fixture;
pub mod rustfmt;

/// Typed failure for adapter resolution.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("unknown formatter `{name}`")]
    Unknown { name: String },

    /// The tool cannot be located or identified. Fatal: no result.
    #[error("formatter `{name}` is unavailable: {detail}")]
    Unavailable { name: String, detail: String },
}

/// Resolve a formatter name to a live adapter.
///
/// # Errors
///
/// Returns [`AdapterError::Unknown`] for unrecognized names and
/// [`AdapterError::Unavailable`] when the tool cannot be located or its
/// version cannot be read.
pub fn resolve(name: &str, format_timeout: Duration) -> Result<Arc<dyn Formatter>, AdapterError> {
    match name {
        clang_format::NAME => {
            Ok(Arc::new(clang_format::ClangFormat::locate(format_timeout)?))
        }
        rustfmt::NAME => Ok(Arc::new(rustfmt::Rustfmt::locate(format_timeout)?)),
        fixture::NAME => Ok(Arc::new(fixture::FixtureFormatter::new())),
        _ => Err(AdapterError::Unknown {
            name: name.to_string(),
        }),
    }
}

/// Fingerprint a located tool from its path and `--version` output, so the
/// cache never aliases across binaries or upgrades.
pub(crate) fn tool_fingerprint(
    program: &std::path::Path,
    version: &[u8],
) -> stylefit_kernel::hash::ContentHash {
    let mut identity = program.display().to_string().into_bytes();
    identity.push(0);
    identity.extend_from_slice(version);
    stylefit_kernel::hash::canonical_hash(
        stylefit_kernel::hash::DOMAIN_FORMATTER_IDENTITY,
        &identity,
    )
}
