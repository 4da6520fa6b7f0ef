//! Search policy: mode, budgets, and resource knobs.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::SearchError;

/// Which phases the engine runs after convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Phases A + B: minimal style.
    #[default]
    Standard,
    /// Standard plus default pinning (phase C): a larger style that is
    /// robust against future formatter-default changes.
    Resilient,
    /// Standard plus alternative-value exploration (phase D).
    Variants,
}

impl SearchMode {
    /// Stable label for logs and reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Resilient => "resilient",
            Self::Variants => "variants",
        }
    }
}

/// Budgets and resource limits for one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPolicy {
    pub mode: SearchMode,
    /// Worker pool size. Defaults to available hardware parallelism.
    pub concurrency: NonZeroUsize,
    /// Per-call wall-clock timeout for one formatter invocation.
    pub format_timeout: Duration,
    /// Greedy-phase iteration bound factor: the bound is
    /// `iteration_factor × option count`. Guards against adapter bugs that
    /// cause oscillation.
    pub iteration_factor: u64,
    /// Maximum hunks rendered per variant (variants mode only).
    pub variants_hunks: usize,
    /// Resident reformatted-output byte budget for the evaluation cache.
    pub max_cache_bytes: usize,
}

impl SearchPolicy {
    /// Validate budget values.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidPolicy`] for zero budgets.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.iteration_factor == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "iteration_factor must be positive".to_string(),
            });
        }
        if self.variants_hunks == 0 {
            return Err(SearchError::InvalidPolicy {
                detail: "variants_hunks must be positive".to_string(),
            });
        }
        if self.format_timeout.is_zero() {
            return Err(SearchError::InvalidPolicy {
                detail: "format_timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            mode: SearchMode::Standard,
            concurrency: default_concurrency(),
            format_timeout: Duration::from_secs(30),
            iteration_factor: 10,
            variants_hunks: 8,
            max_cache_bytes: 64 << 20,
        }
    }
}

/// Hardware thread count, or 1 if it cannot be determined.
#[must_use]
pub fn default_concurrency() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
