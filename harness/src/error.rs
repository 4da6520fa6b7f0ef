//! Run-wide error taxonomy.
//!
//! A fatal error means "could not search"; a large distance in a successful
//! report means "searched, found nothing better". Callers can rely on the
//! distinction: degraded outcomes (budget hit, cancellation after a
//! baseline) come back as `Ok` with the termination reason in the report.

use stylefit_kernel::diff::DiffError;
use stylefit_search::error::SearchError;
use thiserror::Error;

use crate::adapters::AdapterError;

/// Typed failure for a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// No adapter is registered under the requested name.
    #[error("unknown formatter `{name}`")]
    UnknownFormatter { name: String },

    /// The adapter cannot locate or identify its tool. Fatal; no result.
    #[error("formatter `{name}` is unavailable: {detail}")]
    FormatterUnavailable { name: String, detail: String },

    /// The request names no source files.
    #[error("empty corpus: at least one source file is required")]
    EmptyCorpus,

    /// A source file could not be read.
    #[error("failed to read source `{path}`")]
    SourceRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The requested diff backend cannot be used on this host.
    #[error("diff metric unavailable")]
    MetricUnavailable {
        #[source]
        source: DiffError,
    },

    /// A run-wide search failure (no baseline, invalid declarations, ...).
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl From<AdapterError> for RunError {
    fn from(error: AdapterError) -> Self {
        match error {
            AdapterError::Unknown { name } => Self::UnknownFormatter { name },
            AdapterError::Unavailable { name, detail } => {
                Self::FormatterUnavailable { name, detail }
            }
        }
    }
}
