//! Cross-process determinism fixture.
//!
//! Runs the full engine on a fixed in-memory corpus with the fixture
//! formatter and prints the canonical search-log bytes followed by the
//! rendered style. The cross-process lock test runs this binary twice and
//! requires byte-identical output.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use stylefit_harness::adapters::fixture::FixtureFormatter;
use stylefit_kernel::diff::DiffBackend;
use stylefit_kernel::source::SourceFile;
use stylefit_search::cache::EvaluationCache;
use stylefit_search::contract::Formatter;
use stylefit_search::engine::search;
use stylefit_search::evaluator::CancellationToken;
use stylefit_search::policy::SearchPolicy;

fn main() {
    let formatter: Arc<dyn Formatter> = Arc::new(FixtureFormatter::new());
    let corpus = vec![
        SourceFile::from_bytes(
            PathBuf::from("alpha.fix"),
            b"fn alpha() {\n  one;\n  two(a, b);\n}\n".to_vec(),
        ),
        SourceFile::from_bytes(
            PathBuf::from("beta.fix"),
            b"fn beta()\n{\n  nested {\n    deep;\n  }\n}\n".to_vec(),
        ),
    ];
    let policy = SearchPolicy {
        concurrency: NonZeroUsize::new(2).unwrap_or(NonZeroUsize::MIN),
        ..SearchPolicy::default()
    };

    let outcome = search(
        &formatter,
        &corpus,
        &policy,
        DiffBackend::internal(),
        Arc::new(EvaluationCache::new(policy.max_cache_bytes)),
        &CancellationToken::new(),
    )
    .expect("fixture search must succeed");

    let log_bytes = outcome
        .log
        .to_canonical_json_bytes()
        .expect("log serialization must succeed");
    println!("{}", String::from_utf8_lossy(&log_bytes));
    print!("{}", formatter.render_style(&outcome.best.style));
}
