//! Candidates and their total ordering.
//!
//! The ordering on candidates is lexicographic: aggregate distance
//! ascending, then cardinality ascending (the Occam tie-break), then the
//! canonical style fingerprint ascending. It is total, so every selection
//! the engine makes is deterministic.

use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::style::Style;

/// Aggregate distance of a style across the corpus.
///
/// `Infinite` marks per-pair failures (formatter rejection, timeout); it is
/// absorbing under addition and greater than every finite distance, so
/// failed candidates naturally lose every comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Distance {
    Finite(u64),
    Infinite,
}

impl Distance {
    /// Additive combination; `Infinite` absorbs.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => Self::Finite(a.saturating_add(b)),
            _ => Self::Infinite,
        }
    }

    /// Sum of per-file distances.
    #[must_use]
    pub fn sum<I: IntoIterator<Item = Self>>(items: I) -> Self {
        items
            .into_iter()
            .fold(Self::Finite(0), Self::plus)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// JSON representation for the search log.
    #[must_use]
    pub fn to_json(self) -> serde_json::Value {
        match self {
            Self::Finite(n) => serde_json::json!({ "finite": n }),
            Self::Infinite => serde_json::json!("infinite"),
        }
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Infinite => write!(f, "infinite"),
        }
    }
}

/// A style together with its evaluated aggregate distance.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub style: Style,
    pub fingerprint: ContentHash,
    pub distance: Distance,
    pub cardinality: u64,
}

impl Candidate {
    /// Build a candidate, deriving fingerprint and cardinality from the
    /// style.
    #[must_use]
    pub fn new(style: Style, distance: Distance) -> Self {
        let fingerprint = style.fingerprint();
        let cardinality = style.cardinality();
        Self {
            style,
            fingerprint,
            distance,
            cardinality,
        }
    }

    /// The ordering key.
    #[must_use]
    pub fn key(&self) -> CandidateKey {
        CandidateKey {
            distance: self.distance,
            cardinality: self.cardinality,
            fingerprint: self.fingerprint.clone(),
        }
    }

    /// Strict-improvement test: lower distance, or equal distance with
    /// strictly lower cardinality. The fingerprint never decides adoption —
    /// only selection among already-evaluated ties.
    #[must_use]
    pub fn improves_on(&self, incumbent: &Self) -> bool {
        self.distance < incumbent.distance
            || (self.distance == incumbent.distance && self.cardinality < incumbent.cardinality)
    }
}

/// The candidate ordering key: `(distance, cardinality, fingerprint)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKey {
    pub distance: Distance,
    pub cardinality: u64,
    pub fingerprint: ContentHash,
}

impl PartialOrd for CandidateKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CandidateKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .cmp(&other.distance)
            .then(self.cardinality.cmp(&other.cardinality))
            .then_with(|| self.fingerprint.cmp(&other.fingerprint))
    }
}
