//! End-to-end scenario locks on the fixture formatter: identity corpus,
//! single-option delta, unsupportable input, cardinality tie-break,
//! variants exploration, and cancellation after baseline selection.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use stylefit_harness::adapters::fixture::{FixtureFormatter, NAME as FIXTURE, REJECT_MARKER};
use stylefit_harness::error::RunError;
use stylefit_harness::runner::{run, StyleRequest};
use stylefit_kernel::diff::{BackendChoice, DiffBackend};
use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::{OptionDef, OptionValue};
use stylefit_kernel::source::SourceFile;
use stylefit_kernel::style::Style;
use stylefit_search::cache::EvaluationCache;
use stylefit_search::candidate::Distance;
use stylefit_search::contract::{FormatVerdict, Formatter, NamedStyle};
use stylefit_search::engine::search;
use stylefit_search::error::SearchError;
use stylefit_search::evaluator::CancellationToken;
use stylefit_search::log::{CancelPhase, TerminationReason};
use stylefit_search::policy::{SearchMode, SearchPolicy};

fn write_corpus(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn fixture_request(sources: Vec<PathBuf>) -> StyleRequest {
    let mut request = StyleRequest::new(FIXTURE, sources);
    request.diff_backend = BackendChoice::Internal;
    request
}

// ---------------------------------------------------------------------------
// Identity: a corpus already formatted under a base style needs nothing.
// ---------------------------------------------------------------------------

#[test]
fn identity_corpus_returns_the_bare_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(&dir, "id.fix", b"fn main() {\n    body;\n}\n");

    let report = run(&fixture_request(vec![path]), &CancellationToken::new()).unwrap();
    assert_eq!(report.distance, Distance::Finite(0));
    assert!(report.style.is_empty(), "no explicit options expected");
    assert_eq!(report.log.metadata.baseline_name, "default");
}

// ---------------------------------------------------------------------------
// Single-option delta: one deviation from the defaults, one pinned option.
// ---------------------------------------------------------------------------

#[test]
fn single_option_delta_is_recovered_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(&dir, "delta.fix", b"fn main() {\n  body;\n}\n");

    let report = run(&fixture_request(vec![path]), &CancellationToken::new()).unwrap();
    assert_eq!(report.distance, Distance::Finite(0));
    assert_eq!(
        report.style.get("indent_width"),
        Some(&OptionValue::Int(2)),
        "rendered style: {}",
        report.rendered_style
    );
    assert_eq!(report.cardinality, 1, "exactly one explicit option");
}

// ---------------------------------------------------------------------------
// Unsupportable input: every baseline infinite, fatal no-baseline.
// ---------------------------------------------------------------------------

#[test]
fn unsupportable_corpus_surfaces_no_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let mut content = b"fine;\n".to_vec();
    content.extend_from_slice(REJECT_MARKER);
    content.push(b'\n');
    let path = write_corpus(&dir, "bad.fix", &content);

    let err = run(&fixture_request(vec![path]), &CancellationToken::new()).unwrap_err();
    assert!(
        matches!(err, RunError::Search(SearchError::NoBaseline { .. })),
        "expected no-baseline, got {err}"
    );
}

// ---------------------------------------------------------------------------
// Tie-break: two options that independently reach zero distance; canonical
// option-name order decides, and only one is kept.
// ---------------------------------------------------------------------------

#[test]
fn redundant_options_tie_break_by_canonical_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(&dir, "commas.fix", b"call(a, b, c);\n");

    let report = run(&fixture_request(vec![path]), &CancellationToken::new()).unwrap();
    assert_eq!(report.distance, Distance::Finite(0));
    assert_eq!(
        report.style.get("comma_style"),
        Some(&OptionValue::Token("spaced".to_string())),
        "`comma_style` precedes `spaces_after_comma` canonically"
    );
    assert!(
        !report.style.contains("spaces_after_comma"),
        "only one of the redundant options may be pinned"
    );
    assert_eq!(report.cardinality, 1);
}

// ---------------------------------------------------------------------------
// Variants: alternatives with differing output are reported with hunks;
// output-identical alternatives are excluded.
// ---------------------------------------------------------------------------

#[test]
fn variants_report_differing_alternatives_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_corpus(&dir, "delta.fix", b"fn main() {\n  body;\n}\n");

    let mut request = fixture_request(vec![path]);
    request.mode = SearchMode::Variants;
    let report = run(&request, &CancellationToken::new()).unwrap();

    assert_eq!(report.style.get("indent_width"), Some(&OptionValue::Int(2)));

    let indent_back_to_default = report
        .variants
        .iter()
        .find(|v| v.option == "indent_width" && v.value_token == "4")
        .expect("the default indent width must appear as a variant");
    assert!(
        !indent_back_to_default.hunks.is_empty(),
        "a differing variant must carry hunks"
    );

    for variant in &report.variants {
        assert!(
            !variant.hunks.is_empty(),
            "variant {}={} has no differing hunks and must be excluded",
            variant.option,
            variant.value_token
        );
        assert_ne!(
            variant.style_fingerprint,
            report.style_fingerprint.hex_digest(),
            "the final style itself is not a variant"
        );
    }
    assert!(
        !report
            .variants
            .iter()
            .any(|v| v.option == "comma_style" || v.option == "spaces_after_comma"),
        "comma options cannot change a comma-free corpus"
    );
}

// ---------------------------------------------------------------------------
// Cancellation after the baseline: the baseline candidate comes back and no
// greedy-phase formatter invocation is started.
// ---------------------------------------------------------------------------

/// Delegating formatter that flips the cancellation token once the baseline
/// evaluations have all run.
struct CancelAfterBaseline {
    inner: FixtureFormatter,
    cancel: CancellationToken,
    threshold: u64,
    calls: AtomicU64,
}

impl Formatter for CancelAfterBaseline {
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
        let count = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let verdict = self.inner.format(style, source, hint);
        if count == self.threshold {
            self.cancel.cancel();
        }
        verdict
    }
    fn render_style(&self, style: &Style) -> String {
        self.inner.render_style(style)
    }
}

#[test]
fn cancellation_after_baseline_returns_the_baseline() {
    let cancel = CancellationToken::new();
    let inner = FixtureFormatter::new();
    let baseline_pairs = inner.base_styles().len() as u64; // one corpus file
    let wrapper = Arc::new(CancelAfterBaseline {
        inner,
        cancel: cancel.clone(),
        threshold: baseline_pairs,
        calls: AtomicU64::new(0),
    });
    let formatter: Arc<dyn Formatter> = Arc::clone(&wrapper) as Arc<dyn Formatter>;

    let corpus = vec![SourceFile::from_bytes(
        PathBuf::from("c.fix"),
        b"fn main() {\n    body;\n}\n".to_vec(),
    )];
    let policy = SearchPolicy {
        concurrency: NonZeroUsize::new(1).unwrap(),
        ..SearchPolicy::default()
    };

    let outcome = search(
        &formatter,
        &corpus,
        &policy,
        DiffBackend::internal(),
        Arc::new(EvaluationCache::new(policy.max_cache_bytes)),
        &cancel,
    )
    .unwrap();

    assert_eq!(
        outcome.log.metadata.termination,
        TerminationReason::Cancelled {
            phase: CancelPhase::Greedy
        }
    );
    assert!(
        outcome.best.style.is_empty(),
        "the result must be the baseline candidate"
    );
    assert_eq!(
        wrapper.calls.load(Ordering::SeqCst),
        baseline_pairs,
        "no formatter invocation may start after the cancellation point"
    );
}
