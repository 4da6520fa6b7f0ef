//! The evaluation cache.
//!
//! Memoizes (formatter fingerprint, style fingerprint, source fingerprint)
//! → evaluation. Two guarantees:
//!
//! 1. **At-most-one concurrent evaluation per key.** The first requester of
//!    an uncached key becomes the owner and receives a ticket; later
//!    requesters block cooperatively on a condvar and receive the owner's
//!    result. An abandoned ticket (worker panic) wakes waiters so one of
//!    them can take ownership.
//! 2. **Summaries outlive bytes.** Eviction is LRU bounded by resident
//!    output-byte footprint and drops only the reformatted bytes; distances
//!    and hunks are retained for the whole run, because the search needs
//!    distances far more often than bytes.
//!
//! The cache is process-local; nothing is persisted.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use stylefit_kernel::diff::DiffResult;
use stylefit_kernel::hash::ContentHash;

use crate::candidate::Distance;

/// A cache key. Formatter identity is part of the key, so evaluations never
/// alias across tools or tool upgrades.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    formatter: String,
    style: String,
    source: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(formatter: &ContentHash, style: &ContentHash, source: &ContentHash) -> Self {
        Self {
            formatter: formatter.hex_digest().to_string(),
            style: style.hex_digest().to_string(),
            source: source.hex_digest().to_string(),
        }
    }
}

/// Why a (style, file) pair has no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairFailure {
    /// The formatter refused the input or the style.
    Rejected { detail: String },
    /// The per-call wall-clock timeout elapsed.
    TimedOut { limit_ms: u64 },
    /// The worker evaluating this pair panicked.
    WorkerPanicked,
}

/// A memoized evaluation of one (formatter, style, file) triple.
#[derive(Debug, Clone)]
pub enum Evaluation {
    Success {
        /// Digest of the reformatted bytes; retained even after eviction.
        output_digest: ContentHash,
        /// The reformatted bytes; `None` once evicted.
        output: Option<Arc<[u8]>>,
        /// Diff against the reference; retained for the whole run.
        diff: Arc<DiffResult>,
    },
    Failure { reason: PairFailure },
}

impl Evaluation {
    /// The distance this evaluation contributes to an aggregate.
    #[must_use]
    pub fn distance(&self) -> Distance {
        match self {
            Self::Success { diff, .. } => Distance::Finite(diff.distance),
            Self::Failure { .. } => Distance::Infinite,
        }
    }

    fn resident_bytes(&self) -> usize {
        match self {
            Self::Success {
                output: Some(bytes),
                ..
            } => bytes.len(),
            _ => 0,
        }
    }
}

/// Hit/miss counters for the search log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct Slot {
    eval: Evaluation,
    last_used: u64,
}

struct CacheState {
    entries: HashMap<CacheKey, Slot>,
    in_flight: HashSet<CacheKey>,
    tick: u64,
    resident_bytes: usize,
}

/// The process-local evaluation cache. Thread-safe; the only shared mutable
/// object in the system.
pub struct EvaluationCache {
    state: Mutex<CacheState>,
    done: Condvar,
    max_resident_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Result of [`EvaluationCache::claim`].
pub enum Claim {
    /// The evaluation was already known (or just produced by another
    /// requester this call blocked on).
    Ready(Evaluation),
    /// The caller owns the evaluation; it must call
    /// [`EvaluationTicket::complete`] (dropping the ticket abandons the
    /// claim and wakes waiters).
    Owed(EvaluationTicket),
}

/// Ownership token for an in-flight evaluation.
pub struct EvaluationTicket {
    cache: Arc<EvaluationCache>,
    key: Option<CacheKey>,
}

impl EvaluationTicket {
    /// Publish the evaluation and wake waiters.
    pub fn complete(mut self, eval: Evaluation) {
        if let Some(key) = self.key.take() {
            self.cache.insert(key, eval);
        }
    }
}

impl Drop for EvaluationTicket {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.cache.abandon(&key);
        }
    }
}

impl EvaluationCache {
    /// Create a cache whose resident reformatted bytes are bounded by
    /// `max_resident_bytes`.
    #[must_use]
    pub fn new(max_resident_bytes: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                in_flight: HashSet::new(),
                tick: 0,
                resident_bytes: 0,
            }),
            done: Condvar::new(),
            max_resident_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up or take ownership of `key`.
    ///
    /// Blocks cooperatively while another requester owns the key, and then
    /// returns that requester's result. Counts exactly one hit or miss per
    /// call that resolves (waiting on an in-flight key counts as a hit —
    /// no subprocess was spent for this caller).
    pub fn claim(self: &Arc<Self>, key: CacheKey) -> Claim {
        let mut state = self.lock_state();
        loop {
            if state.entries.contains_key(&key) {
                state.tick += 1;
                let tick = state.tick;
                if let Some(slot) = state.entries.get_mut(&key) {
                    slot.last_used = tick;
                    let eval = slot.eval.clone();
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Claim::Ready(eval);
                }
            }
            if state.in_flight.contains(&key) {
                state = self
                    .done
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            state.in_flight.insert(key.clone());
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Claim::Owed(EvaluationTicket {
                cache: Arc::clone(self),
                key: Some(key),
            });
        }
    }

    /// Non-blocking lookup. Bumps recency, does not touch the counters.
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<Evaluation> {
        let mut state = self.lock_state();
        state.tick += 1;
        let tick = state.tick;
        let slot = state.entries.get_mut(key)?;
        slot.last_used = tick;
        Some(slot.eval.clone())
    }

    /// Current hit/miss counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn insert(&self, key: CacheKey, eval: Evaluation) {
        let mut state = self.lock_state();
        state.in_flight.remove(&key);
        state.tick += 1;
        let tick = state.tick;
        state.resident_bytes += eval.resident_bytes();
        state.entries.insert(
            key,
            Slot {
                eval,
                last_used: tick,
            },
        );
        self.evict_locked(&mut state);
        drop(state);
        self.done.notify_all();
    }

    fn abandon(&self, key: &CacheKey) {
        let mut state = self.lock_state();
        state.in_flight.remove(key);
        drop(state);
        self.done.notify_all();
    }

    /// Drop reformatted bytes (never summaries) from least-recently-used
    /// entries until the resident footprint fits the bound.
    fn evict_locked(&self, state: &mut MutexGuard<'_, CacheState>) {
        while state.resident_bytes > self.max_resident_bytes {
            let victim = state
                .entries
                .iter()
                .filter(|(_, slot)| slot.eval.resident_bytes() > 0)
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(key, _)| key.clone());
            let Some(key) = victim else {
                break;
            };
            if let Some(slot) = state.entries.get_mut(&key) {
                let freed = slot.eval.resident_bytes();
                if let Evaluation::Success { output, .. } = &mut slot.eval {
                    *output = None;
                }
                state.resident_bytes -= freed;
                tracing::trace!(bytes = freed, "evicted reformatted output bytes");
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
