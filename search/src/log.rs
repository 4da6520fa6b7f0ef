//! `SearchLog`: the decision audit artifact.
//!
//! The normative decision surface is the ordered trial records: what was
//! evaluated, in which canonical position, with which distance, and what
//! was adopted. The log serializes through the canonical JSON writer, so
//! two runs of the same inputs are comparable byte-for-byte — the
//! determinism lock tests compare exactly these bytes.

use stylefit_kernel::canon::{canonical_json_bytes, CanonError};
use stylefit_kernel::hash::{canonical_hash, ContentHash, DOMAIN_SEARCH_LOG};

use crate::candidate::Distance;

/// One evaluated trial: a base style in phase A, an (option, value)
/// substitution in phases B and D.
#[derive(Debug, Clone)]
pub struct TrialRecord {
    /// Canonical position within the enumeration that produced this trial.
    pub position: u64,
    /// Human-readable provenance: a base-style name or `option=token`.
    pub label: String,
    /// Fingerprint of the trial style.
    pub style_fingerprint: String,
    pub distance: Distance,
    pub cardinality: u64,
    pub adopted: bool,
}

/// One greedy iteration: the trials evaluated and what, if anything, was
/// adopted.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub index: u64,
    pub trials: Vec<TrialRecord>,
    /// Fingerprint of the adopted trial, absent when the iteration
    /// converged.
    pub adopted_fingerprint: Option<String>,
}

/// One explicit default pin added by resilient mode.
#[derive(Debug, Clone)]
pub struct PinRecord {
    pub option: String,
    pub value_token: String,
}

/// Why the search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// No trial strictly improved on the incumbent.
    Converged,
    /// The iteration bound was hit; the best candidate seen is returned.
    IterationBudgetExceeded { iterations: u64, bound: u64 },
    /// External cancellation; the best candidate seen is returned.
    Cancelled { phase: CancelPhase },
}

/// The phase during which cancellation was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelPhase {
    Greedy,
    Resilient,
    Variants,
}

impl CancelPhase {
    fn label(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Resilient => "resilient",
            Self::Variants => "variants",
        }
    }
}

/// Aggregate metadata with snapshot bindings.
#[derive(Debug, Clone)]
pub struct SearchLogMetadata {
    pub formatter_name: String,
    pub formatter_fingerprint: String,
    /// Source-file fingerprints in corpus order.
    pub corpus: Vec<String>,
    pub diff_backend: String,
    pub mode: String,
    pub baseline_name: String,
    pub termination: TerminationReason,
    pub iterations: u64,
    pub trials_evaluated: u64,
    pub adoptions: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub result_fingerprint: String,
    pub result_distance: Distance,
    pub result_cardinality: u64,
}

/// The complete search audit trail.
#[derive(Debug, Clone)]
pub struct SearchLog {
    /// Phase A evaluations in base-style declaration order.
    pub base_trials: Vec<TrialRecord>,
    /// Phase B iterations in order.
    pub iterations: Vec<IterationRecord>,
    /// Phase C pins in canonical option order.
    pub pins: Vec<PinRecord>,
    pub metadata: SearchLogMetadata,
}

impl SearchLog {
    /// Serialize to canonical JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanonError`] if serialization fails (the log contains only
    /// integers, strings and booleans, so this indicates a bug).
    pub fn to_canonical_json_bytes(&self) -> Result<Vec<u8>, CanonError> {
        canonical_json_bytes(&self.to_json_value())
    }

    /// Content hash of the canonical bytes.
    ///
    /// # Errors
    ///
    /// Propagates serialization failure from
    /// [`SearchLog::to_canonical_json_bytes`].
    pub fn content_hash(&self) -> Result<ContentHash, CanonError> {
        Ok(canonical_hash(
            DOMAIN_SEARCH_LOG,
            &self.to_canonical_json_bytes()?,
        ))
    }

    fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "base_trials": self.base_trials.iter().map(trial_to_json).collect::<Vec<_>>(),
            "iterations": self.iterations.iter().map(iteration_to_json).collect::<Vec<_>>(),
            "pins": self.pins.iter().map(pin_to_json).collect::<Vec<_>>(),
            "metadata": metadata_to_json(&self.metadata),
        })
    }
}

fn trial_to_json(t: &TrialRecord) -> serde_json::Value {
    serde_json::json!({
        "position": t.position,
        "label": t.label,
        "style_fingerprint": t.style_fingerprint,
        "distance": t.distance.to_json(),
        "cardinality": t.cardinality,
        "adopted": t.adopted,
    })
}

fn iteration_to_json(i: &IterationRecord) -> serde_json::Value {
    let mut obj = serde_json::json!({
        "index": i.index,
        "trials": i.trials.iter().map(trial_to_json).collect::<Vec<_>>(),
    });
    obj["adopted_fingerprint"] = match &i.adopted_fingerprint {
        Some(fp) => serde_json::Value::String(fp.clone()),
        None => serde_json::Value::Null,
    };
    obj
}

fn pin_to_json(p: &PinRecord) -> serde_json::Value {
    serde_json::json!({
        "option": p.option,
        "value": p.value_token,
    })
}

fn termination_to_json(t: TerminationReason) -> serde_json::Value {
    match t {
        TerminationReason::Converged => serde_json::json!({"type": "converged"}),
        TerminationReason::IterationBudgetExceeded { iterations, bound } => {
            serde_json::json!({
                "type": "iteration_budget_exceeded",
                "iterations": iterations,
                "bound": bound,
            })
        }
        TerminationReason::Cancelled { phase } => {
            serde_json::json!({"type": "cancelled", "phase": phase.label()})
        }
    }
}

fn metadata_to_json(m: &SearchLogMetadata) -> serde_json::Value {
    serde_json::json!({
        "formatter_name": m.formatter_name,
        "formatter_fingerprint": m.formatter_fingerprint,
        "corpus": m.corpus,
        "diff_backend": m.diff_backend,
        "mode": m.mode,
        "baseline_name": m.baseline_name,
        "termination": termination_to_json(m.termination),
        "iterations": m.iterations,
        "trials_evaluated": m.trials_evaluated,
        "adoptions": m.adoptions,
        "cache_hits": m.cache_hits,
        "cache_misses": m.cache_misses,
        "result_fingerprint": m.result_fingerprint,
        "result_distance": m.result_distance.to_json(),
        "result_cardinality": m.result_cardinality,
    })
}
