//! Stylefit Search: the style search engine.
//!
//! This crate owns the policy layer of the system: candidate generation,
//! parallel evaluation with memoization, and greedy convergence to a
//! minimal style. It depends only on `stylefit-kernel` — it does NOT depend
//! on `stylefit-harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! stylefit-kernel  ←  stylefit-search  ←  stylefit-harness
//! (diff, styles)      (engine, cache)     (adapters, runner)
//! ```
//!
//! # Key types
//!
//! - [`contract::Formatter`] — the capability trait adapters implement
//! - [`candidate::Candidate`] — a style with its evaluated aggregate distance
//! - [`cache::EvaluationCache`] — memoized evaluations, one in-flight per key
//! - [`evaluator::Evaluator`] — bounded worker pool over (style, file) pairs
//! - [`engine::search`] — the four-phase search loop
//! - [`log::SearchLog`] — canonical audit artifact of every decision

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod candidate;
pub mod contract;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod frontier;
pub mod log;
pub mod policy;
