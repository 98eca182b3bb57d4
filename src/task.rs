//! Per-sequence unit of work. Each task owns one sequence, one pattern
//! cursor and its mode, runs to completion on its own thread, and counts the
//! shared completion barrier down exactly once, whichever way it exits.

use crate::{
    TRANSLATIONS,
    completion::CompletionGuard,
    fold::{FoldGateway, FoldOutcome, FoldPrediction},
    fold_gate::FoldGate,
    loop_matcher::{MatchParams, MatchPass, MatchSubject},
    patterns::PatternSource,
    rna_sequence::RnaSequence,
    sink::ResultSink,
    vienna::ViennaStructure,
};
use std::sync::Arc;

/// Execution strategy, fixed at construction. Each variant carries exactly
/// what its strategy needs: only the fold mode can reach the admission gate,
/// and the supplied-structure mode has no reverse flag at all.
pub enum TaskMode {
    /// Match against a pre-supplied dot-bracket structure.
    Supplied { vienna: ViennaStructure },
    /// Match directly against the raw sequence, no folding involved.
    Plain {
        sequence: RnaSequence,
        search_reverse: bool,
    },
    /// Fold once up front, then run gate-throttled structure passes.
    Fold {
        sequence: RnaSequence,
        search_reverse: bool,
        gateway: Arc<FoldGateway>,
        gate: Arc<FoldGate>,
    },
}

pub struct SequenceTask {
    mode: TaskMode,
    params: MatchParams,
    patterns: PatternSource,
    matcher: Arc<dyn MatchPass>,
    sink: Arc<dyn ResultSink>,
    guard: CompletionGuard,
}

impl SequenceTask {
    pub fn new(
        mode: TaskMode,
        params: MatchParams,
        patterns: PatternSource,
        matcher: Arc<dyn MatchPass>,
        sink: Arc<dyn ResultSink>,
        guard: CompletionGuard,
    ) -> Self {
        Self {
            mode,
            params,
            patterns,
            matcher,
            sink,
            guard,
        }
    }

    /// The cursor may be swapped before the run starts, never after.
    pub fn set_patterns(&mut self, patterns: PatternSource) {
        self.patterns = patterns;
    }

    pub fn run(self) {
        let SequenceTask {
            mode,
            params,
            mut patterns,
            matcher,
            sink,
            guard,
        } = self;
        // counts the barrier down on every exit path, panics included
        let _guard = guard;

        match mode {
            TaskMode::Supplied { vienna } => {
                run_supplied(&vienna, &params, &mut patterns, &*matcher, &*sink)
            }
            TaskMode::Plain {
                sequence,
                search_reverse,
            } => run_plain(
                &sequence,
                search_reverse,
                &params,
                &mut patterns,
                &*matcher,
                &*sink,
            ),
            TaskMode::Fold {
                sequence,
                search_reverse,
                gateway,
                gate,
            } => run_fold(
                &sequence,
                search_reverse,
                &gateway,
                &gate,
                &params,
                &mut patterns,
                &*matcher,
                &*sink,
            ),
        }
    }
}

fn next_pattern(item: std::io::Result<String>) -> Option<String> {
    match item {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            eprintln!("{} {e}", TRANSLATIONS.get("err_pattern_read"));
            None
        }
    }
}

fn log_match_error(id: &str, e: &crate::loop_matcher::MatchError) {
    eprintln!("[{id}] {} {e}", TRANSLATIONS.get("err_match_failed"));
}

fn run_supplied(
    vienna: &ViennaStructure,
    params: &MatchParams,
    patterns: &mut PatternSource,
    matcher: &dyn MatchPass,
    sink: &dyn ResultSink,
) {
    for item in patterns.by_ref() {
        let Some(pattern) = next_pattern(item) else {
            continue;
        };
        let subject = MatchSubject::Supplied { vienna };
        if let Err(e) = matcher.run(subject, &pattern, sink, false, params) {
            log_match_error(&vienna.display_id(), &e);
        }
    }
}

fn run_plain(
    sequence: &RnaSequence,
    search_reverse: bool,
    params: &MatchParams,
    patterns: &mut PatternSource,
    matcher: &dyn MatchPass,
    sink: &dyn ResultSink,
) {
    for item in patterns.by_ref() {
        let Some(pattern) = next_pattern(item) else {
            continue;
        };
        let subject = MatchSubject::Plain { sequence };
        if let Err(e) = matcher.run(subject, &pattern, sink, false, params) {
            log_match_error(&sequence.display_id(), &e);
        }
        if search_reverse {
            if let Err(e) = matcher.run(subject, &pattern, sink, true, params) {
                log_match_error(&sequence.display_id(), &e);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_fold(
    sequence: &RnaSequence,
    search_reverse: bool,
    gateway: &FoldGateway,
    gate: &FoldGate,
    params: &MatchParams,
    patterns: &mut PatternSource,
    matcher: &dyn MatchPass,
    sink: &dyn ResultSink,
) {
    let id = sequence.display_id();
    let prediction = match gateway.predict(
        &sequence.get_forward_string(),
        params.temperature,
        params.avoid_lonely_pairs,
    ) {
        FoldOutcome::Folded(prediction) => prediction,
        FoldOutcome::SizeExceeded { limit, .. } => {
            eprintln!(
                "{} - {} {limit}",
                sequence.truncated_id(),
                TRANSLATIONS.get("err_size_limit")
            );
            return;
        }
        FoldOutcome::Failed { message } => {
            match message {
                Some(m) => eprintln!("[{id}] {} {m}", TRANSLATIONS.get("err_fold_failed")),
                None => eprintln!("[{id}] {}", TRANSLATIONS.get("err_fold_unknown")),
            }
            return;
        }
    };

    for item in patterns.by_ref() {
        let Some(pattern) = next_pattern(item) else {
            continue;
        };
        gated_pass(
            gate,
            matcher,
            sequence,
            &prediction,
            &pattern,
            sink,
            false,
            params,
            "pass_forward",
        );
        // the reverse pass is its own permit transaction; the forward
        // permit is back in the pool before this acquire can block
        if search_reverse {
            gated_pass(
                gate,
                matcher,
                sequence,
                &prediction,
                &pattern,
                sink,
                true,
                params,
                "pass_reverse",
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn gated_pass(
    gate: &FoldGate,
    matcher: &dyn MatchPass,
    sequence: &RnaSequence,
    prediction: &FoldPrediction,
    pattern: &str,
    sink: &dyn ResultSink,
    reverse: bool,
    params: &MatchParams,
    site_key: &str,
) {
    let _permit = match gate.acquire() {
        Ok(permit) => permit,
        Err(e) => {
            eprintln!(
                "[{}] {} {e} ({})",
                sequence.display_id(),
                TRANSLATIONS.get("err_permit_wait"),
                TRANSLATIONS.get(site_key)
            );
            return;
        }
    };
    let subject = MatchSubject::Folded {
        sequence,
        structure: &prediction.structure,
    };
    if let Err(e) = matcher.run(subject, pattern, sink, reverse, params) {
        log_match_error(&sequence.display_id(), &e);
    }
    // _permit drops here: the permit is returned even when the pass failed
}
