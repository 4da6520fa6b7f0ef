//! Shared corpus builders for the stylefit benchmarks.

#![forbid(unsafe_code)]

use std::path::PathBuf;

use stylefit_kernel::source::SourceFile;

/// A synthetic brace-language corpus file with `blocks` nested blocks,
/// 2-space indentation and spaced commas.
#[must_use]
pub fn synthetic_source(name: &str, blocks: usize) -> SourceFile {
    let mut text = String::new();
    for i in 0..blocks {
        text.push_str(&format!("fn block_{i}() {{\n"));
        text.push_str(&format!("  first_{i};\n"));
        text.push_str(&format!("  call_{i}(a, b, c);\n"));
        text.push_str("}\n");
        if i + 1 < blocks {
            text.push('\n');
        }
    }
    SourceFile::from_bytes(PathBuf::from(name), text.into_bytes())
}

/// A small multi-file corpus.
#[must_use]
pub fn synthetic_corpus(files: usize, blocks: usize) -> Vec<SourceFile> {
    (0..files)
        .map(|i| synthetic_source(&format!("bench_{i}.fix"), blocks))
        .collect()
}
