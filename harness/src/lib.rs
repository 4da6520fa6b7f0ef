//! Stylefit Harness: formatter adapters and run orchestration.
//!
//! The harness implements the formatter capability contract for real tools
//! (subprocess invocation, option tables, native style rendering) and owns
//! the request → report pipeline. It contains no search logic — candidate
//! generation, caching and convergence live in `stylefit-search`.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adapters;
pub mod error;
pub mod invoke;
pub mod runner;
