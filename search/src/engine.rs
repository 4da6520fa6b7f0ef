//! The search engine: baseline selection, greedy option attachment,
//! resilient pinning, variants exploration.
//!
//! The engine itself is single-threaded. It suspends only at batch
//! boundaries — every enumeration order is canonical (options by name,
//! values by token, base styles by declaration) and every batch is fully
//! collected before the next decision, so results are byte-identical across
//! runs and across worker-pool sizes.
//!
//! Greedy adoption uses the strict-improvement rule (lower distance, or
//! equal distance with strictly lower cardinality). Combined with the
//! iteration bound this rules out oscillation between options that toggle
//! each other at equal distance.

use std::collections::BTreeSet;
use std::sync::Arc;

use stylefit_kernel::diff::{split_lines, DiffBackend, HunkKind};
use stylefit_kernel::hash::ContentHash;
use stylefit_kernel::options::{validate_options, OptionDef};
use stylefit_kernel::source::SourceFile;
use stylefit_kernel::style::Style;

use crate::cache::EvaluationCache;
use crate::candidate::{Candidate, Distance};
use crate::contract::Formatter;
use crate::error::SearchError;
use crate::evaluator::{BatchOutcome, CancellationToken, Evaluator};
use crate::frontier::Frontier;
use crate::log::{
    CancelPhase, IterationRecord, PinRecord, SearchLog, SearchLogMetadata, TerminationReason,
    TrialRecord,
};
use crate::policy::{SearchMode, SearchPolicy};

/// The final result of a search run.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// The selected style with its aggregate distance.
    pub best: Candidate,
    /// The decision audit trail.
    pub log: SearchLog,
    /// Variants-mode records (empty in other modes).
    pub variants: Vec<VariantRecord>,
}

/// One differing alternative discovered in variants mode.
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub option: String,
    pub value_token: String,
    pub style_fingerprint: String,
    /// Aggregate distance of the trial against the reference corpus.
    pub distance: Distance,
    /// Differing regions between the final style's output and the trial's
    /// output, bounded by the variants-hunks budget.
    pub hunks: Vec<VariantHunk>,
    pub truncated: bool,
}

/// One differing region, with extracted text for side-by-side rendering.
#[derive(Debug, Clone)]
pub struct VariantHunk {
    pub path: String,
    pub kind: HunkKind,
    pub final_start: usize,
    pub final_text: String,
    pub trial_start: usize,
    pub trial_text: String,
}

/// A candidate substitution generated by one canonical enumeration pass.
struct Trial {
    position: u64,
    option: String,
    value_token: String,
    style: Style,
    fingerprint: ContentHash,
}

impl Trial {
    fn label(&self) -> String {
        format!("{}={}", self.option, self.value_token)
    }
}

/// Run the style search.
///
/// Returns the minimal candidate under the (distance, cardinality,
/// fingerprint) ordering, the audit log, and — in variants mode — the
/// differing alternatives. Degraded terminations (iteration budget,
/// cancellation after a baseline exists) are reported in the log's
/// termination reason, not as errors.
///
/// # Errors
///
/// - [`SearchError::InvalidPolicy`] / [`SearchError::InvalidOptions`] on
///   pre-flight validation failures.
/// - [`SearchError::NoBaseStyles`] / [`SearchError::NoBaseline`] when the
///   formatter exposes nothing to start from or fails on every file.
/// - [`SearchError::Cancelled`] when cancellation arrives before any
///   baseline candidate was scored.
#[allow(clippy::too_many_lines)]
pub fn search(
    formatter: &Arc<dyn Formatter>,
    corpus: &[SourceFile],
    policy: &SearchPolicy,
    backend: DiffBackend,
    cache: Arc<EvaluationCache>,
    cancel: &CancellationToken,
) -> Result<SearchOutcome, SearchError> {
    policy.validate()?;
    let mut defs = formatter.options().to_vec();
    validate_options(&defs).map_err(|source| SearchError::InvalidOptions {
        name: formatter.name().to_string(),
        source,
    })?;
    defs.sort_by(|a, b| a.name.cmp(&b.name));

    let backend_label = backend.label();
    let evaluator = Evaluator::new(
        Arc::clone(formatter),
        backend,
        Arc::clone(&cache),
        policy.concurrency,
        cancel.clone(),
    );

    let mut frontier = Frontier::new();

    // Phase A: score every named base style and install the minimal one.
    let (base_trials, baseline_name) =
        select_baseline(formatter.as_ref(), corpus, &evaluator, &mut frontier)?;
    tracing::info!(
        baseline = %baseline_name,
        distance = %frontier.best().map_or(Distance::Infinite, |c| c.distance),
        "baseline selected"
    );

    // Phase B: greedy option attachment under strict improvement.
    let option_count = defs.len().max(1) as u64;
    let bound = policy.iteration_factor.saturating_mul(option_count);
    let mut iterations: Vec<IterationRecord> = Vec::new();
    let mut termination = TerminationReason::Converged;

    loop {
        if cancel.is_cancelled() {
            termination = TerminationReason::Cancelled {
                phase: CancelPhase::Greedy,
            };
            break;
        }
        let done = iterations.len() as u64;
        if done >= bound {
            tracing::warn!(
                iterations = done,
                bound,
                "search did not converge within the iteration bound"
            );
            termination = TerminationReason::IterationBudgetExceeded {
                iterations: done,
                bound,
            };
            break;
        }

        let incumbent = match frontier.best() {
            Some(best) => best.clone(),
            None => break,
        };
        let trials = enumerate_trials(&defs, &incumbent, &frontier);
        if trials.is_empty() {
            break;
        }

        let styles: Vec<Style> = trials.iter().map(|t| t.style.clone()).collect();
        let BatchOutcome::Scored(totals) = evaluator.evaluate_styles(&styles, corpus) else {
            termination = TerminationReason::Cancelled {
                phase: CancelPhase::Greedy,
            };
            break;
        };

        frontier.note_evaluated(trials.len() as u64);
        for trial in &trials {
            frontier.mark_visited(trial.fingerprint.hex_digest());
        }

        let mut records = trial_records(&trials, &totals);
        let Some(winner) = minimal_index(&trials, &totals) else {
            break;
        };
        let candidate = Candidate::new(trials[winner].style.clone(), totals[winner]);
        let index = iterations.len() as u64;
        let adopted = frontier.offer(candidate);
        if adopted {
            records[winner].adopted = true;
            tracing::debug!(
                trial = %trials[winner].label(),
                distance = %totals[winner],
                "adopted trial"
            );
        }
        iterations.push(IterationRecord {
            index,
            adopted_fingerprint: adopted
                .then(|| trials[winner].fingerprint.hex_digest().to_string()),
            trials: records,
        });
        if !adopted {
            break;
        }
    }

    let mut result = frontier
        .best()
        .cloned()
        .ok_or(SearchError::Cancelled)?;

    // Phase C: pin defaults whose explicit presence leaves every output
    // byte-identical. Enlarges cardinality deliberately.
    let mut pins: Vec<PinRecord> = Vec::new();
    if policy.mode == SearchMode::Resilient && termination == TerminationReason::Converged {
        match pin_defaults(&defs, &result, corpus, &evaluator, &mut frontier, cancel) {
            PinOutcome::Pinned { candidate, records } => {
                result = candidate;
                pins = records;
            }
            PinOutcome::Cancelled { candidate, records } => {
                result = candidate;
                pins = records;
                termination = TerminationReason::Cancelled {
                    phase: CancelPhase::Resilient,
                };
            }
        }
    }

    // Phase D: explore admissible alternatives and keep the ones whose
    // output differs from the final style's output.
    let mut variants: Vec<VariantRecord> = Vec::new();
    if policy.mode == SearchMode::Variants && !cancel.is_cancelled() {
        match explore_variants(&defs, &result, corpus, &evaluator, policy.variants_hunks) {
            VariantsOutcome::Explored(records) => variants = records,
            VariantsOutcome::Cancelled => {
                termination = TerminationReason::Cancelled {
                    phase: CancelPhase::Variants,
                };
            }
        }
    }

    let stats = cache.stats();
    let log = SearchLog {
        base_trials,
        iterations: iterations.clone(),
        pins,
        metadata: SearchLogMetadata {
            formatter_name: formatter.name().to_string(),
            formatter_fingerprint: formatter.fingerprint().hex_digest().to_string(),
            corpus: corpus
                .iter()
                .map(|s| s.fingerprint().hex_digest().to_string())
                .collect(),
            diff_backend: backend_label.to_string(),
            mode: policy.mode.label().to_string(),
            baseline_name,
            termination,
            iterations: iterations.len() as u64,
            trials_evaluated: frontier.trials_evaluated(),
            adoptions: frontier.adoptions(),
            cache_hits: stats.hits,
            cache_misses: stats.misses,
            result_fingerprint: result.fingerprint.hex_digest().to_string(),
            result_distance: result.distance,
            result_cardinality: result.cardinality,
        },
    };
    tracing::info!(
        style = %result.fingerprint.hex_digest(),
        distance = %result.distance,
        cardinality = result.cardinality,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        "search finished"
    );

    Ok(SearchOutcome {
        best: result,
        log,
        variants,
    })
}

/// Phase A: evaluate every named base style, pick the minimal candidate.
fn select_baseline(
    formatter: &dyn Formatter,
    corpus: &[SourceFile],
    evaluator: &Evaluator,
    frontier: &mut Frontier,
) -> Result<(Vec<TrialRecord>, String), SearchError> {
    let named = formatter.base_styles();
    if named.is_empty() {
        return Err(SearchError::NoBaseStyles {
            name: formatter.name().to_string(),
        });
    }

    // Dedup presets that alias the same mapping; first declaration wins.
    let mut seen = BTreeSet::new();
    let mut presets = Vec::new();
    for preset in named {
        let fingerprint = preset.style.fingerprint();
        if seen.insert(fingerprint.hex_digest().to_string()) {
            presets.push((preset, fingerprint));
        }
    }

    let styles: Vec<Style> = presets.iter().map(|(p, _)| p.style.clone()).collect();
    let BatchOutcome::Scored(totals) = evaluator.evaluate_styles(&styles, corpus) else {
        return Err(SearchError::Cancelled);
    };
    frontier.note_evaluated(presets.len() as u64);

    let mut records: Vec<TrialRecord> = presets
        .iter()
        .zip(&totals)
        .enumerate()
        .map(|(i, ((preset, fingerprint), distance))| TrialRecord {
            position: i as u64,
            label: preset.name.clone(),
            style_fingerprint: fingerprint.hex_digest().to_string(),
            distance: *distance,
            cardinality: preset.style.cardinality(),
            adopted: false,
        })
        .collect();

    // Minimal under (distance, cardinality, declaration position).
    let mut winner = 0;
    for i in 1..presets.len() {
        let better = (totals[i], presets[i].0.style.cardinality())
            < (totals[winner], presets[winner].0.style.cardinality());
        if better {
            winner = i;
        }
    }

    if !totals[winner].is_finite() {
        return Err(SearchError::NoBaseline {
            name: formatter.name().to_string(),
            detail: format!("{} base styles, all scored infinite", presets.len()),
        });
    }

    records[winner].adopted = true;
    let (preset, _) = &presets[winner];
    let baseline_name = preset.name.clone();
    frontier.install(Candidate::new(preset.style.clone(), totals[winner]));
    for (_, fingerprint) in &presets {
        frontier.mark_visited(fingerprint.hex_digest());
    }
    Ok((records, baseline_name))
}

/// Canonical trial enumeration for one greedy iteration: every (option,
/// admissible value) substitution, deduped by fingerprint, skipping the
/// incumbent and anything already evaluated.
fn enumerate_trials(defs: &[OptionDef], incumbent: &Candidate, frontier: &Frontier) -> Vec<Trial> {
    let mut seen = BTreeSet::new();
    let mut trials = Vec::new();
    for def in defs {
        let current = incumbent.style.effective(def);
        for value in def.trial_values(&current) {
            let style = incumbent.style.substituted(def, value.clone());
            let fingerprint = style.fingerprint();
            if fingerprint == incumbent.fingerprint {
                continue;
            }
            let hex = fingerprint.hex_digest().to_string();
            if frontier.is_visited(&hex) || !seen.insert(hex) {
                continue;
            }
            trials.push(Trial {
                position: trials.len() as u64,
                option: def.name.clone(),
                value_token: value.token(),
                style,
                fingerprint,
            });
        }
    }
    trials
}

fn trial_records(trials: &[Trial], totals: &[Distance]) -> Vec<TrialRecord> {
    trials
        .iter()
        .zip(totals)
        .map(|(trial, distance)| TrialRecord {
            position: trial.position,
            label: trial.label(),
            style_fingerprint: trial.fingerprint.hex_digest().to_string(),
            distance: *distance,
            cardinality: trial.style.cardinality(),
            adopted: false,
        })
        .collect()
}

/// Index of the minimal trial under (distance, cardinality, canonical
/// position). The position tie-break realizes the canonical ordering on
/// option name and value token; fingerprints never need to decide within
/// one enumeration because positions are unique.
fn minimal_index(trials: &[Trial], totals: &[Distance]) -> Option<usize> {
    (0..trials.len()).min_by_key(|&i| (totals[i], trials[i].style.cardinality(), i))
}

enum PinOutcome {
    Pinned {
        candidate: Candidate,
        records: Vec<PinRecord>,
    },
    Cancelled {
        candidate: Candidate,
        records: Vec<PinRecord>,
    },
}

/// Phase C: for each option absent from the final style, find the value
/// whose explicit pin reproduces every output byte-for-byte and add it.
///
/// Output identity (digest equality on every file) is deliberately stronger
/// than distance equality: a pin that changed output while coincidentally
/// preserving distance would not survive a later standard-mode run.
fn pin_defaults(
    defs: &[OptionDef],
    best: &Candidate,
    corpus: &[SourceFile],
    evaluator: &Evaluator,
    frontier: &mut Frontier,
    cancel: &CancellationToken,
) -> PinOutcome {
    let mut candidate = best.clone();
    let mut records = Vec::new();

    let final_digests: Vec<Option<ContentHash>> = corpus
        .iter()
        .map(|source| evaluator.output_digest(&best.fingerprint, source))
        .collect();
    if final_digests.iter().any(Option::is_none) {
        // A finite-distance candidate always has outputs; be safe anyway.
        return PinOutcome::Pinned { candidate, records };
    }

    for def in defs {
        if cancel.is_cancelled() {
            return PinOutcome::Cancelled { candidate, records };
        }
        if candidate.style.contains(&def.name) {
            continue;
        }

        // The declared default is the likeliest effective value; try it
        // first, then the rest of the canonical neighborhood.
        let mut values = vec![def.default.clone()];
        for value in def.domain_values(&def.default) {
            if value != def.default {
                values.push(value);
            }
        }
        let styles: Vec<Style> = values
            .iter()
            .map(|value| candidate.style.with_value(&def.name, value.clone()))
            .collect();
        let BatchOutcome::Scored(totals) = evaluator.evaluate_styles(&styles, corpus) else {
            return PinOutcome::Cancelled { candidate, records };
        };
        frontier.note_evaluated(styles.len() as u64);

        for ((value, style), total) in values.iter().zip(&styles).zip(&totals) {
            if *total != candidate.distance {
                continue;
            }
            let style_fp = style.fingerprint();
            let identical = corpus.iter().zip(&final_digests).all(|(source, expected)| {
                evaluator.output_digest(&style_fp, source).as_ref() == expected.as_ref()
            });
            if identical {
                tracing::debug!(option = %def.name, value = %value.token(), "pinned default");
                records.push(PinRecord {
                    option: def.name.clone(),
                    value_token: value.token(),
                });
                candidate = Candidate::new(style.clone(), candidate.distance);
                break;
            }
        }
    }

    PinOutcome::Pinned { candidate, records }
}

enum VariantsOutcome {
    Explored(Vec<VariantRecord>),
    Cancelled,
}

/// Phase D: evaluate every admissible alternative of the final style and
/// keep those whose output differs, with hunks against the final output.
fn explore_variants(
    defs: &[OptionDef],
    final_candidate: &Candidate,
    corpus: &[SourceFile],
    evaluator: &Evaluator,
    hunk_budget: usize,
) -> VariantsOutcome {
    // A fresh dedup scope: trials evaluated during the greedy phase must
    // reappear here (their evaluations come from the cache anyway).
    let scratch = Frontier::new();
    let trials = enumerate_trials(defs, final_candidate, &scratch);
    if trials.is_empty() {
        return VariantsOutcome::Explored(Vec::new());
    }

    let styles: Vec<Style> = trials.iter().map(|t| t.style.clone()).collect();
    let BatchOutcome::Scored(totals) = evaluator.evaluate_styles(&styles, corpus) else {
        return VariantsOutcome::Cancelled;
    };

    let final_digests: Vec<Option<ContentHash>> = corpus
        .iter()
        .map(|source| evaluator.output_digest(&final_candidate.fingerprint, source))
        .collect();

    let mut records = Vec::new();
    for (trial, total) in trials.iter().zip(&totals) {
        let mut differing = Vec::new();
        for (fi, source) in corpus.iter().enumerate() {
            let trial_digest = evaluator.output_digest(&trial.fingerprint, source);
            if trial_digest.is_some() && trial_digest != final_digests[fi] {
                differing.push(fi);
            }
        }
        if differing.is_empty() {
            continue;
        }

        let mut hunks = Vec::new();
        let mut truncated = false;
        'files: for fi in differing {
            let source = &corpus[fi];
            let Some(final_bytes) = evaluator.output_bytes(&final_candidate.style, source) else {
                continue;
            };
            let Some(trial_bytes) = evaluator.output_bytes(&trial.style, source) else {
                continue;
            };
            let diff = evaluator.backend().measure(&final_bytes, &trial_bytes);
            for hunk in diff.hunks {
                if hunks.len() >= hunk_budget {
                    truncated = true;
                    break 'files;
                }
                hunks.push(VariantHunk {
                    path: source.path().display().to_string(),
                    kind: hunk.kind,
                    final_start: hunk.reference_start,
                    final_text: extract_lines(
                        &final_bytes,
                        hunk.reference_start,
                        hunk.reference_lines,
                    ),
                    trial_start: hunk.candidate_start,
                    trial_text: extract_lines(
                        &trial_bytes,
                        hunk.candidate_start,
                        hunk.candidate_lines,
                    ),
                });
            }
        }
        if hunks.is_empty() {
            continue;
        }
        records.push(VariantRecord {
            option: trial.option.clone(),
            value_token: trial.value_token.clone(),
            style_fingerprint: trial.fingerprint.hex_digest().to_string(),
            distance: *total,
            hunks,
            truncated,
        });
    }
    VariantsOutcome::Explored(records)
}

/// Extract `count` lines starting at line index `start`, lossily decoded.
fn extract_lines(bytes: &[u8], start: usize, count: usize) -> String {
    let lines = split_lines(bytes);
    lines
        .iter()
        .skip(start)
        .take(count)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect()
}
