//! Diff-backend equivalence: every available backend reports the same
//! integer distance for the same input pair. External tools are probed and
//! skipped gracefully when the host lacks them.

use stylefit_kernel::diff::{select_backend, BackendChoice, DiffBackend};

const PAIRS: &[(&[u8], &[u8])] = &[
    (b"", b""),
    (b"a\nb\nc\n", b"a\nb\nc\n"),
    (b"a\nb\nc\n", b"a\nx\nc\n"),
    (b"a\nc\n", b"a\nb\nc\n"),
    (b"a\nb\nc\n", b"a\nc\n"),
    (b"a\nb\n", b"a\nb"),
    (b"", b"one\ntwo\n"),
    (b"alpha\nbravo\ncharlie\ndelta\n", b"alpha\nBRAVO\ncharlie\nDELTA\n"),
    (b"x\n", b"y\nz\nx\n"),
];

fn available_backends() -> Vec<DiffBackend> {
    let mut backends = vec![select_backend(BackendChoice::Internal).expect("internal always works")];
    if let Ok(backend) = select_backend(BackendChoice::ExternalDiff) {
        backends.push(backend);
    }
    if let Ok(backend) = select_backend(BackendChoice::ExternalGit) {
        backends.push(backend);
    }
    backends
}

#[test]
fn all_available_backends_agree_on_distances() {
    let backends = available_backends();
    if backends.len() == 1 {
        eprintln!("no external diff tool on this host; internal-only run");
    }

    for &(reference, candidate) in PAIRS {
        let reference_distance = backends[0].measure(reference, candidate).distance;
        for backend in &backends[1..] {
            assert_eq!(
                backend.measure(reference, candidate).distance,
                reference_distance,
                "backend `{}` disagrees on {:?} vs {:?}",
                backend.label(),
                String::from_utf8_lossy(reference),
                String::from_utf8_lossy(candidate),
            );
        }
    }
}

#[test]
fn distances_are_symmetric_in_total_count() {
    // Swapping the pair swaps insertions and deletions; the total is equal.
    let backends = available_backends();
    for &(reference, candidate) in PAIRS {
        for backend in &backends {
            assert_eq!(
                backend.measure(reference, candidate).distance,
                backend.measure(candidate, reference).distance,
                "backend `{}` asymmetric on a pair",
                backend.label(),
            );
        }
    }
}
