//! Cache correctness locks: a key observed twice triggers no second
//! formatter invocation and returns identical results; identical work
//! requested concurrently is evaluated exactly once.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stylefit_harness::adapters::fixture::FixtureFormatter;
use stylefit_kernel::diff::DiffBackend;
use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::OptionDef;
use stylefit_kernel::source::SourceFile;
use stylefit_kernel::style::Style;
use stylefit_search::cache::EvaluationCache;
use stylefit_search::contract::{FormatVerdict, Formatter, NamedStyle};
use stylefit_search::evaluator::{BatchOutcome, CancellationToken, Evaluator};

/// Fixture formatter wrapper that counts `format` invocations.
struct Counting {
    inner: FixtureFormatter,
    calls: AtomicU64,
}

impl Counting {
    fn new() -> Self {
        Self {
            inner: FixtureFormatter::new(),
            calls: AtomicU64::new(0),
        }
    }
}

impl Formatter for Counting {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn fingerprint(&self) -> &ContentHash {
        self.inner.fingerprint()
    }
    fn options(&self) -> &[OptionDef] {
        self.inner.options()
    }
    fn base_styles(&self) -> Vec<NamedStyle> {
        self.inner.base_styles()
    }
    fn format(&self, style: &Style, source: &[u8], hint: &str) -> FormatVerdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.format(style, source, hint)
    }
    fn render_style(&self, style: &Style) -> String {
        self.inner.render_style(style)
    }
}

fn corpus() -> Vec<SourceFile> {
    vec![SourceFile::from_bytes(
        PathBuf::from("c.fix"),
        b"fn main() {\n  body(a, b);\n}\n".to_vec(),
    )]
}

fn evaluator(counting: &Arc<Counting>, workers: usize, cache_bytes: usize) -> Evaluator {
    Evaluator::new(
        Arc::clone(counting) as Arc<dyn Formatter>,
        DiffBackend::internal(),
        Arc::new(EvaluationCache::new(cache_bytes)),
        NonZeroUsize::new(workers).expect("positive worker count"),
        CancellationToken::new(),
    )
}

#[test]
fn second_observation_triggers_no_subprocess() {
    let counting = Arc::new(Counting::new());
    let eval = evaluator(&counting, 2, 1 << 20);
    let corpus = corpus();
    let styles = [Style::empty()];

    let BatchOutcome::Scored(first) = eval.evaluate_styles(&styles, &corpus) else {
        panic!("batch must complete")
    };
    assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

    let BatchOutcome::Scored(second) = eval.evaluate_styles(&styles, &corpus) else {
        panic!()
    };
    assert_eq!(first, second, "cached result must be identical");
    assert_eq!(
        counting.calls.load(Ordering::SeqCst),
        1,
        "the second observation must be served from the cache"
    );
    assert_eq!(eval.cache().stats().misses, 1);
    assert_eq!(eval.cache().stats().hits, 1);
}

#[test]
fn concurrent_identical_pairs_evaluate_once() {
    let counting = Arc::new(Counting::new());
    let eval = evaluator(&counting, 8, 1 << 20);
    let corpus = corpus();

    // Eight identical trial styles in one batch: all pairs share one cache
    // key, so exactly one formatter invocation may happen.
    let styles = vec![Style::empty(); 8];
    let BatchOutcome::Scored(totals) = eval.evaluate_styles(&styles, &corpus) else {
        panic!()
    };
    assert_eq!(totals.len(), 8);
    assert!(totals.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(
        counting.calls.load(Ordering::SeqCst),
        1,
        "at-most-one concurrent evaluation per key"
    );
}

#[test]
fn eviction_keeps_distances_available_without_subprocesses() {
    let counting = Arc::new(Counting::new());
    // Zero resident budget: output bytes are evicted immediately.
    let eval = evaluator(&counting, 2, 0);
    let corpus = corpus();
    let styles = [Style::empty()];

    let BatchOutcome::Scored(first) = eval.evaluate_styles(&styles, &corpus) else {
        panic!()
    };
    let calls = counting.calls.load(Ordering::SeqCst);

    // Distances are still served from the cache after byte eviction.
    let BatchOutcome::Scored(second) = eval.evaluate_styles(&styles, &corpus) else {
        panic!()
    };
    assert_eq!(first, second);
    assert_eq!(
        counting.calls.load(Ordering::SeqCst),
        calls,
        "distance lookups must not re-run the formatter"
    );

    // Fetching output bytes after eviction recomputes exactly once.
    let bytes = eval.output_bytes(&Style::empty(), &corpus[0]).unwrap();
    assert!(!bytes.is_empty());
    assert_eq!(counting.calls.load(Ordering::SeqCst), calls + 1);
}
