//! Typed search errors.
//!
//! Only run-wide failures surface here. Per-pair failures (formatter
//! rejection, timeout) degrade to infinite distances and are absorbed by
//! the candidate ordering; degraded-but-usable outcomes (budget hit,
//! cancellation after a baseline) are reported through the termination
//! reason, not as errors.

use stylefit_kernel::options::OptionDeclError;
use thiserror::Error;

/// Typed failure for search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The adapter declares no base styles at all.
    #[error("formatter `{name}` declares no base styles")]
    NoBaseStyles { name: String },

    /// Every base style scored infinite on every file: the formatter cannot
    /// run on this corpus.
    #[error("no base style could be scored for `{name}`: {detail}")]
    NoBaseline { name: String, detail: String },

    /// The adapter's option table failed validation.
    #[error("invalid option declaration for `{name}`")]
    InvalidOptions {
        name: String,
        #[source]
        source: OptionDeclError,
    },

    /// A zero or nonsensical budget in the search policy.
    #[error("invalid search policy: {detail}")]
    InvalidPolicy { detail: String },

    /// Cancellation arrived before any baseline candidate existed, so there
    /// is no best-so-far to return.
    #[error("search cancelled before a baseline candidate was established")]
    Cancelled,
}
