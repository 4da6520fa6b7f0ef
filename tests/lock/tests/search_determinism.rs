//! Determinism lock tests: repeated runs and different worker-pool sizes
//! must produce byte-identical search logs and identical result styles.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use stylefit_harness::adapters::fixture::FixtureFormatter;
use stylefit_kernel::diff::DiffBackend;
use stylefit_kernel::source::SourceFile;
use stylefit_search::cache::EvaluationCache;
use stylefit_search::candidate::Distance;
use stylefit_search::contract::Formatter;
use stylefit_search::engine::{search, SearchOutcome};
use stylefit_search::evaluator::CancellationToken;
use stylefit_search::policy::SearchPolicy;

fn corpus() -> Vec<SourceFile> {
    vec![
        SourceFile::from_bytes(
            PathBuf::from("alpha.fix"),
            b"fn alpha() {\n  one;\n  two(a, b);\n}\n".to_vec(),
        ),
        SourceFile::from_bytes(
            PathBuf::from("beta.fix"),
            b"fn beta() {\n  inner {\n  nested;\n  }\n}\n".to_vec(),
        ),
    ]
}

fn run_search(workers: usize) -> SearchOutcome {
    let formatter: Arc<dyn Formatter> = Arc::new(FixtureFormatter::new());
    let policy = SearchPolicy {
        concurrency: NonZeroUsize::new(workers).expect("positive worker count"),
        ..SearchPolicy::default()
    };
    search(
        &formatter,
        &corpus(),
        &policy,
        DiffBackend::internal(),
        Arc::new(EvaluationCache::new(policy.max_cache_bytes)),
        &CancellationToken::new(),
    )
    .expect("fixture search must succeed")
}

#[test]
fn repeated_runs_are_byte_identical() {
    let first = run_search(2);
    let first_bytes = first.log.to_canonical_json_bytes().unwrap();
    for _ in 1..5 {
        let other = run_search(2);
        assert_eq!(
            other.log.to_canonical_json_bytes().unwrap(),
            first_bytes,
            "search log bytes differ across identical runs"
        );
    }
}

#[test]
fn worker_pool_size_never_changes_the_result() {
    let reference = run_search(1);
    let reference_bytes = reference.log.to_canonical_json_bytes().unwrap();
    for workers in [2, 4, 8] {
        let other = run_search(workers);
        assert_eq!(
            other.best.fingerprint, reference.best.fingerprint,
            "result style differs at {workers} workers"
        );
        assert_eq!(
            other.best.distance, reference.best.distance,
            "aggregate distance differs at {workers} workers"
        );
        assert_eq!(
            other.log.to_canonical_json_bytes().unwrap(),
            reference_bytes,
            "search log differs at {workers} workers"
        );
    }
}

#[test]
fn greedy_phase_improves_monotonically() {
    let outcome = run_search(2);

    // Reconstruct the incumbent's (distance, cardinality) after each
    // adoption; the tuple must strictly decrease lexicographically.
    let baseline = outcome
        .log
        .base_trials
        .iter()
        .find(|t| t.adopted)
        .expect("a baseline must be adopted");
    let mut incumbent = (baseline.distance, baseline.cardinality);

    for iteration in &outcome.log.iterations {
        let Some(adopted) = iteration.trials.iter().find(|t| t.adopted) else {
            continue;
        };
        let next = (adopted.distance, adopted.cardinality);
        assert!(
            next < incumbent,
            "adopted step did not strictly improve: {next:?} vs {incumbent:?}"
        );
        incumbent = next;
    }

    assert_eq!(
        (outcome.best.distance, outcome.best.cardinality),
        incumbent,
        "final candidate must be the last adopted incumbent"
    );
}

#[test]
fn search_reaches_a_finite_distance_on_formattable_corpora() {
    let outcome = run_search(2);
    assert!(matches!(outcome.best.distance, Distance::Finite(_)));
}

#[test]
fn log_metadata_carries_the_snapshot_bindings() {
    let outcome = run_search(2);
    let bytes = outcome.log.to_canonical_json_bytes().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let meta = &json["metadata"];

    assert!(meta["formatter_name"].is_string());
    assert!(meta["formatter_fingerprint"].is_string());
    assert_eq!(meta["corpus"].as_array().map(Vec::len), Some(2));
    assert_eq!(meta["diff_backend"], "internal");
    assert_eq!(meta["mode"], "standard");
    assert!(meta["baseline_name"].is_string());
    assert!(meta["termination"].is_object());
    assert!(meta["result_fingerprint"].is_string());
    assert!(json["base_trials"].is_array());
    assert!(json["iterations"].is_array());
}
