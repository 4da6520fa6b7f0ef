//! Cross-process determinism: two child-process runs of the search fixture
//! binary must print byte-identical canonical logs and styles.

use std::process::Command;

fn run_fixture() -> Vec<u8> {
    let output = Command::new(env!("CARGO_BIN_EXE_search_fixture"))
        .output()
        .expect("search_fixture binary must run");
    assert!(
        output.status.success(),
        "search_fixture failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

#[test]
fn cross_process_runs_are_byte_identical() {
    let first = run_fixture();
    assert!(!first.is_empty(), "fixture must print the log and style");
    let second = run_fixture();
    assert_eq!(first, second, "cross-process outputs differ");
}
