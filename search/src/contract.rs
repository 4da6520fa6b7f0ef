//! Formatter capability contract.
//!
//! The engine consumes formatters through this trait only; each adapter in
//! `stylefit-harness` is an independent implementation. No inheritance
//! chain — a uniform capability surface over heterogeneous tools.

use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::OptionDef;
use stylefit_kernel::style::Style;

/// A named preset style exposed by a formatter (e.g. "LLVM", "Google").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStyle {
    pub name: String,
    pub style: Style,
}

impl NamedStyle {
    #[must_use]
    pub fn new(name: &str, style: Style) -> Self {
        Self {
            name: name.to_string(),
            style,
        }
    }
}

/// Outcome of one formatter invocation over one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatVerdict {
    /// The reformatted bytes.
    Output(Vec<u8>),
    /// The tool refused the input or the style (per-pair failure; scored as
    /// infinite distance).
    Rejected { detail: String },
    /// The per-call wall-clock timeout elapsed (per-pair failure; scored as
    /// infinite distance).
    TimedOut { limit_ms: u64 },
}

/// The capability contract a formatter adapter implements.
///
/// # Contract
///
/// - `options()` and `base_styles()` are immutable for the lifetime of the
///   adapter and deterministically ordered; `base_styles()` returns at
///   least one entry (an adapter without presets exposes a single empty
///   default style).
/// - `format` must be a pure function of `(style, source, filename_hint)`;
///   the adapter hides any tool nondeterminism or declares the tool
///   unsupported. The engine calls it concurrently from worker threads; the
///   adapter serializes internally only if the underlying tool requires it.
/// - `fingerprint()` identifies the tool binary and version so cached
///   evaluations never alias across upgrades.
/// - The engine never mutates an option or style it received from the
///   adapter.
pub trait Formatter: Send + Sync {
    /// Adapter identifier (e.g. `"clang-format"`).
    fn name(&self) -> &str;

    /// Identity of the underlying tool binary and version.
    fn fingerprint(&self) -> &ContentHash;

    /// The searchable option surface.
    fn options(&self) -> &[OptionDef];

    /// Named base styles, in declaration order. Never empty.
    fn base_styles(&self) -> Vec<NamedStyle>;

    /// Apply `style` to `source`, returning reformatted bytes or a
    /// per-pair failure marker.
    fn format(&self, style: &Style, source: &[u8], filename_hint: &str) -> FormatVerdict;

    /// Serialize `style` in the tool's native configuration syntax.
    fn render_style(&self, style: &Style) -> String;
}
