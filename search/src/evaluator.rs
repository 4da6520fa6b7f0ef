//! The parallel evaluator.
//!
//! Dispatches uncached (style, file) evaluations to a bounded worker pool.
//! Each worker owns at most one in-flight formatter invocation; the cache's
//! at-most-one-evaluation guarantee deduplicates identical work requested
//! concurrently. Results are collected by pair index, so worker-pool size
//! and completion order never influence an aggregate.
//!
//! Cancellation is batch-granular: workers check the shared token before
//! starting a job (running tool invocations finish; the tool itself is only
//! killed by its own timeout) and queued jobs yield a cancelled marker.

use std::num::NonZeroUsize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use stylefit_kernel::diff::DiffBackend;
use stylefit_kernel::hash::{canonical_hash, ContentHash, DOMAIN_REFORMATTED_OUTPUT};
use stylefit_kernel::source::SourceFile;
use stylefit_kernel::style::Style;

use crate::cache::{CacheKey, Claim, Evaluation, EvaluationCache, PairFailure};
use crate::candidate::Distance;
use crate::contract::{FormatVerdict, Formatter};

/// Cooperative cancellation signal, honored at batch boundaries and before
/// each job start.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A basic bounded worker pool fed over a crossbeam channel.
///
/// The sender field sits above the handles so the channel closes before the
/// worker threads are joined on drop.
struct WorkerPool {
    sender: Option<crossbeam_channel::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    fn new(threads: NonZeroUsize) -> Self {
        let threads = threads.get();
        // Small buffer: submission backpressure keeps batch memory bounded.
        let (sender, receiver) = crossbeam_channel::bounded::<Job>(std::cmp::min(threads * 2, 4));

        let mut handles = Vec::with_capacity(threads);
        for i in 0..threads {
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("stylefit:worker:{i}"))
                .spawn(move || {
                    for job in &receiver {
                        job();
                    }
                })
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }

        Self {
            sender: Some(sender),
            handles,
        }
    }

    fn submit(&self, job: Job) {
        if let Some(sender) = &self.sender {
            if sender.send(job).is_err() {
                tracing::error!("worker pool channel closed; job dropped");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets every worker drain and exit.
        self.sender.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Per-pair message from a worker.
enum PairMessage {
    Distance(Distance),
    Cancelled,
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Aggregate distance per trial style, in input order.
    Scored(Vec<Distance>),
    /// Cancellation was observed; aggregates are meaningless.
    Cancelled,
}

/// The parallel evaluator: formatter + frozen diff backend + cache + pool.
pub struct Evaluator {
    formatter: Arc<dyn Formatter>,
    backend: Arc<DiffBackend>,
    cache: Arc<EvaluationCache>,
    pool: WorkerPool,
    cancel: CancellationToken,
}

impl Evaluator {
    #[must_use]
    pub fn new(
        formatter: Arc<dyn Formatter>,
        backend: DiffBackend,
        cache: Arc<EvaluationCache>,
        concurrency: NonZeroUsize,
        cancel: CancellationToken,
    ) -> Self {
        tracing::debug!(
            workers = concurrency.get(),
            backend = backend.label(),
            "evaluator ready"
        );
        Self {
            formatter,
            backend: Arc::new(backend),
            cache,
            pool: WorkerPool::new(concurrency),
            cancel,
        }
    }

    /// The formatter under evaluation.
    #[must_use]
    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    /// The frozen diff backend.
    #[must_use]
    pub fn backend(&self) -> &DiffBackend {
        &self.backend
    }

    /// The shared cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }

    /// Evaluate a batch of trial styles against the full corpus.
    ///
    /// Every (style, file) pair resolves through the cache; misses run on
    /// the worker pool. Per-pair failures surface as infinite distances in
    /// the aggregate without aborting sibling pairs.
    #[must_use]
    pub fn evaluate_styles(&self, styles: &[Style], corpus: &[SourceFile]) -> BatchOutcome {
        if styles.is_empty() || corpus.is_empty() {
            return BatchOutcome::Scored(vec![Distance::Finite(0); styles.len()]);
        }

        let style_fps: Vec<ContentHash> = styles.iter().map(Style::fingerprint).collect();
        let total_pairs = styles.len() * corpus.len();
        let (sender, receiver) = crossbeam_channel::unbounded::<(usize, PairMessage)>();

        for (si, style) in styles.iter().enumerate() {
            for (fi, source) in corpus.iter().enumerate() {
                let index = si * corpus.len() + fi;
                let key = CacheKey::new(
                    self.formatter.fingerprint(),
                    &style_fps[si],
                    source.fingerprint(),
                );
                let sender = sender.clone();
                let cancel = self.cancel.clone();
                let cache = Arc::clone(&self.cache);
                let formatter = Arc::clone(&self.formatter);
                let backend = Arc::clone(&self.backend);
                let style = style.clone();
                let source = source.clone();

                self.pool.submit(Box::new(move || {
                    if cancel.is_cancelled() {
                        let _ = sender.send((index, PairMessage::Cancelled));
                        return;
                    }
                    let eval = match cache.claim(key) {
                        Claim::Ready(eval) => eval,
                        Claim::Owed(ticket) => {
                            let eval = catch_unwind(AssertUnwindSafe(|| {
                                evaluate_pair(
                                    formatter.as_ref(),
                                    &backend,
                                    &style,
                                    &source,
                                )
                            }))
                            .unwrap_or_else(|_| {
                                tracing::error!(
                                    source = %source.path().display(),
                                    "formatter adapter panicked; pair scored as infinite"
                                );
                                Evaluation::Failure {
                                    reason: PairFailure::WorkerPanicked,
                                }
                            });
                            ticket.complete(eval.clone());
                            eval
                        }
                    };
                    let _ = sender.send((index, PairMessage::Distance(eval.distance())));
                }));
            }
        }
        drop(sender);

        let mut slots: Vec<Option<PairMessage>> = Vec::with_capacity(total_pairs);
        slots.resize_with(total_pairs, || None);
        for (index, message) in receiver {
            slots[index] = Some(message);
        }

        let mut totals = Vec::with_capacity(styles.len());
        for si in 0..styles.len() {
            let mut total = Distance::Finite(0);
            for fi in 0..corpus.len() {
                match slots[si * corpus.len() + fi].take() {
                    Some(PairMessage::Distance(d)) => total = total.plus(d),
                    Some(PairMessage::Cancelled) => return BatchOutcome::Cancelled,
                    None => {
                        // A result never arrived (worker thread lost).
                        tracing::error!("missing pair result; scored as infinite");
                        total = Distance::Infinite;
                    }
                }
            }
            totals.push(total);
        }
        BatchOutcome::Scored(totals)
    }

    /// Cached evaluation for a (style fingerprint, file), if present.
    #[must_use]
    pub fn cached(&self, style_fp: &ContentHash, source: &SourceFile) -> Option<Evaluation> {
        let key = CacheKey::new(self.formatter.fingerprint(), style_fp, source.fingerprint());
        self.cache.peek(&key)
    }

    /// Reformatted output digest for a (style fingerprint, file), if the
    /// pair was evaluated successfully. Digests survive byte eviction.
    #[must_use]
    pub fn output_digest(&self, style_fp: &ContentHash, source: &SourceFile) -> Option<ContentHash> {
        match self.cached(style_fp, source)? {
            Evaluation::Success { output_digest, .. } => Some(output_digest),
            Evaluation::Failure { .. } => None,
        }
    }

    /// Reformatted output bytes for a (style, file).
    ///
    /// Served from the cache when resident; recomputed inline on the
    /// calling thread when the bytes were evicted. Returns `None` when the
    /// formatter fails on the pair.
    #[must_use]
    pub fn output_bytes(&self, style: &Style, source: &SourceFile) -> Option<Arc<[u8]>> {
        let style_fp = style.fingerprint();
        if let Some(Evaluation::Success {
            output: Some(bytes),
            ..
        }) = self.cached(&style_fp, source)
        {
            return Some(bytes);
        }
        match evaluate_pair(self.formatter.as_ref(), &self.backend, style, source) {
            Evaluation::Success { output, .. } => output,
            Evaluation::Failure { .. } => None,
        }
    }
}

/// Run one formatter invocation and score its output.
fn evaluate_pair(
    formatter: &dyn Formatter,
    backend: &DiffBackend,
    style: &Style,
    source: &SourceFile,
) -> Evaluation {
    match formatter.format(style, source.bytes(), &source.filename_hint()) {
        FormatVerdict::Output(bytes) => {
            let diff = backend.measure(source.bytes(), &bytes);
            let output_digest = canonical_hash(DOMAIN_REFORMATTED_OUTPUT, &bytes);
            Evaluation::Success {
                output_digest,
                output: Some(Arc::from(bytes.into_boxed_slice())),
                diff: Arc::new(diff),
            }
        }
        FormatVerdict::Rejected { detail } => {
            tracing::debug!(
                source = %source.path().display(),
                detail,
                "formatter rejected pair"
            );
            Evaluation::Failure {
                reason: PairFailure::Rejected { detail },
            }
        }
        FormatVerdict::TimedOut { limit_ms } => {
            tracing::debug!(
                source = %source.path().display(),
                limit_ms,
                "formatter invocation timed out"
            );
            Evaluation::Failure {
                reason: PairFailure::TimedOut { limit_ms },
            }
        }
    }
}
