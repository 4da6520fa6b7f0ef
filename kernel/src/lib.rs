//! Stylefit Kernel: the leaf primitives of the style inference engine.
//!
//! # API surface
//!
//! - [`hash`] -- content-addressed fingerprints with domain separation
//! - [`canon`] -- the single canonical-JSON-bytes implementation
//! - [`options`] -- formatter option declarations and trial-value generation
//! - [`style`] -- immutable option/value mappings with fingerprints
//! - [`source`] -- reference corpus files, read once and fingerprinted
//! - [`diff`] -- the line-oriented diff metric and its backends
//!
//! # Module dependency direction
//!
//! `hash` ← `canon` ← {`options`, `style`, `source`} ← `diff`
//!
//! One-way only. No cycles. The kernel knows nothing about formatters,
//! caches, or the search loop; those live in `stylefit-search` and
//! `stylefit-harness`.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod canon;
pub mod diff;
pub mod hash;
pub mod options;
pub mod source;
pub mod style;
