//! The run orchestrator: request → adapter → corpus → engine → report.
//!
//! The runner owns wiring only — adapter resolution, corpus loading, diff
//! backend probing, cache construction — and delegates every search
//! decision to `stylefit-search`.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use stylefit_kernel::diff::{select_backend, BackendChoice};
use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::source::SourceFile;
use stylefit_kernel::style::Style;
use stylefit_search::cache::EvaluationCache;
use stylefit_search::candidate::Distance;
use stylefit_search::engine::{search, VariantRecord};
use stylefit_search::evaluator::CancellationToken;
use stylefit_search::log::{SearchLog, TerminationReason};
use stylefit_search::policy::{default_concurrency, SearchMode, SearchPolicy};

use crate::adapters;
use crate::error::RunError;

/// A structured run request: the complete invocation surface of the core.
#[derive(Debug, Clone)]
pub struct StyleRequest {
    /// Adapter identifier (e.g. `"clang-format"`).
    pub formatter_name: String,
    /// Reference corpus paths, in order.
    pub sources: Vec<PathBuf>,
    pub mode: SearchMode,
    /// Worker count; `None` means hardware parallelism.
    pub concurrency: Option<NonZeroUsize>,
    pub diff_backend: BackendChoice,
    /// Hunks rendered per variant (variants mode only).
    pub variants_hunks: usize,
    /// Per-call formatter timeout.
    pub format_timeout: Duration,
    /// Resident reformatted-output byte budget for the cache.
    pub max_cache_bytes: usize,
}

impl StyleRequest {
    /// A request with default knobs.
    #[must_use]
    pub fn new(formatter_name: &str, sources: Vec<PathBuf>) -> Self {
        let defaults = SearchPolicy::default();
        Self {
            formatter_name: formatter_name.to_string(),
            sources,
            mode: SearchMode::Standard,
            concurrency: None,
            diff_backend: BackendChoice::Auto,
            variants_hunks: defaults.variants_hunks,
            format_timeout: defaults.format_timeout,
            max_cache_bytes: defaults.max_cache_bytes,
        }
    }

    fn policy(&self) -> SearchPolicy {
        SearchPolicy {
            mode: self.mode,
            concurrency: self.concurrency.unwrap_or_else(default_concurrency),
            format_timeout: self.format_timeout,
            variants_hunks: self.variants_hunks,
            max_cache_bytes: self.max_cache_bytes,
            ..SearchPolicy::default()
        }
    }
}

/// The result surface returned to callers.
#[derive(Debug, Clone)]
pub struct StyleReport {
    pub formatter_name: String,
    /// The selected style in the formatter's native config syntax.
    pub rendered_style: String,
    /// The selected style as a canonical mapping.
    pub style: Style,
    pub style_fingerprint: ContentHash,
    pub distance: Distance,
    pub cardinality: u64,
    pub termination: TerminationReason,
    /// Differing alternatives (variants mode only).
    pub variants: Vec<VariantRecord>,
    /// The decision audit trail.
    pub log: SearchLog,
}

/// Execute one run.
///
/// # Errors
///
/// Returns [`RunError`] for run-wide failures: unknown or unavailable
/// formatter, unreadable corpus, unavailable diff backend, or a fatal
/// search error (no baseline). Degraded outcomes are `Ok` with the
/// termination reason set in the report.
pub fn run(request: &StyleRequest, cancel: &CancellationToken) -> Result<StyleReport, RunError> {
    let policy = request.policy();
    tracing::info!(
        formatter = %request.formatter_name,
        sources = request.sources.len(),
        mode = policy.mode.label(),
        "starting style search"
    );

    let formatter = adapters::resolve(&request.formatter_name, request.format_timeout)?;

    if request.sources.is_empty() {
        return Err(RunError::EmptyCorpus);
    }
    let mut corpus = Vec::with_capacity(request.sources.len());
    for path in &request.sources {
        let source = SourceFile::load(path).map_err(|source| RunError::SourceRead {
            path: path.display().to_string(),
            source,
        })?;
        corpus.push(source);
    }

    let backend = select_backend(request.diff_backend)
        .map_err(|source| RunError::MetricUnavailable { source })?;
    let cache = Arc::new(EvaluationCache::new(policy.max_cache_bytes));

    let outcome = search(&formatter, &corpus, &policy, backend, cache, cancel)?;

    let report = StyleReport {
        formatter_name: formatter.name().to_string(),
        rendered_style: formatter.render_style(&outcome.best.style),
        style: outcome.best.style.clone(),
        style_fingerprint: outcome.best.fingerprint.clone(),
        distance: outcome.best.distance,
        cardinality: outcome.best.cardinality,
        termination: outcome.log.metadata.termination,
        variants: outcome.variants,
        log: outcome.log,
    };
    tracing::info!(
        distance = %report.distance,
        cardinality = report.cardinality,
        "style search finished"
    );
    Ok(report)
}
