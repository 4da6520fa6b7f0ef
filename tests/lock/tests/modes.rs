//! Mode locks: resilient pinning, cardinality minimality, and the
//! relationship between standard and resilient results.

use std::path::PathBuf;

use stylefit_harness::adapters::fixture::NAME as FIXTURE;
use stylefit_harness::runner::{run, StyleRequest};
use stylefit_kernel::diff::BackendChoice;
use stylefit_kernel::options::OptionValue;
use stylefit_search::candidate::Distance;
use stylefit_search::evaluator::CancellationToken;
use stylefit_search::policy::SearchMode;

// Two deviations from the defaults on separate lines (2-space indent,
// spaced commas) so greedy attachment can fix them one step at a time.
const DELTA_CORPUS: &[u8] = b"fn main() {\n  body;\n  call(a, b);\n}\n";

fn request_for(dir: &tempfile::TempDir, mode: SearchMode) -> StyleRequest {
    let path = dir.path().join("corpus.fix");
    std::fs::write(&path, DELTA_CORPUS).unwrap();
    let mut request = StyleRequest::new(FIXTURE, vec![path]);
    request.diff_backend = BackendChoice::Internal;
    request.mode = mode;
    request
}

#[test]
fn resilient_mode_extends_the_standard_result() {
    let dir = tempfile::tempdir().unwrap();
    let standard = run(
        &request_for(&dir, SearchMode::Standard),
        &CancellationToken::new(),
    )
    .unwrap();
    let resilient = run(
        &request_for(&dir, SearchMode::Resilient),
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(standard.distance, resilient.distance);
    // Every standard pin survives verbatim.
    for (name, value) in standard.style.iter() {
        assert_eq!(
            resilient.style.get(name),
            Some(value),
            "standard pin `{name}` must survive resilient mode"
        );
    }
    assert!(
        resilient.cardinality > standard.cardinality,
        "resilient mode deliberately enlarges cardinality"
    );
    assert!(!resilient.log.pins.is_empty());
}

#[test]
fn resilient_pins_reproduce_the_exact_output() {
    let dir = tempfile::tempdir().unwrap();
    let resilient = run(
        &request_for(&dir, SearchMode::Resilient),
        &CancellationToken::new(),
    )
    .unwrap();

    // The pinned style still scores zero on the corpus: pins changed
    // nothing observable.
    assert_eq!(resilient.distance, Distance::Finite(0));

    // The searched option is pinned at its discovered value, not a default.
    assert_eq!(
        resilient.style.get("indent_width"),
        Some(&OptionValue::Int(2))
    );
    // A pinned default: the effective brace style was `attach` all along.
    assert_eq!(
        resilient.style.get("brace_style"),
        Some(&OptionValue::Token("attach".to_string()))
    );
}

#[test]
fn standard_result_is_cardinality_minimal() {
    let dir = tempfile::tempdir().unwrap();
    let standard = run(
        &request_for(&dir, SearchMode::Standard),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(standard.distance, Distance::Finite(0));
    assert!(standard.cardinality >= 1);

    // Removing any explicit option and re-running must not reach an equal
    // or better candidate: re-run standard mode on a corpus formatted the
    // same way and check each option is load-bearing via the log.
    for (name, _) in standard.style.iter() {
        let removed = standard.style.without(name);
        assert!(
            removed.cardinality() < standard.cardinality,
            "sanity: removal lowers cardinality"
        );
        // The engine already evaluated this exact style (it is one
        // substitution away from the result); find it in the log and check
        // it scored strictly worse.
        let removed_fp = removed.fingerprint().hex_digest().to_string();
        let record = standard
            .log
            .base_trials
            .iter()
            .chain(standard.log.iterations.iter().flat_map(|i| i.trials.iter()))
            .find(|t| t.style_fingerprint == removed_fp);
        if let Some(record) = record {
            assert!(
                record.distance > standard.distance,
                "option `{name}` is removable without cost; result not minimal"
            );
        }
    }
}

#[test]
fn standard_mode_is_idempotent_over_resilient_pins() {
    // Property: the resilient result and the standard result select the
    // same effective formatting; a standard re-run on the same corpus can
    // never prefer a different observable style.
    let dir = tempfile::tempdir().unwrap();
    let standard_a = run(
        &request_for(&dir, SearchMode::Standard),
        &CancellationToken::new(),
    )
    .unwrap();
    let standard_b = run(
        &request_for(&dir, SearchMode::Standard),
        &CancellationToken::new(),
    )
    .unwrap();
    assert_eq!(standard_a.style_fingerprint, standard_b.style_fingerprint);
    assert_eq!(standard_a.rendered_style, standard_b.rendered_style);
}
