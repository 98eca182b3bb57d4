//! Batch driver: one task per input sequence, a shared admission gate for
//! the fold-dependent path, a completion barrier to block on, one sink
//! flush at the end.

use crate::{
    TRANSLATIONS,
    completion::{CompletionBarrier, CompletionGuard},
    fold::{FoldEngine, FoldGateway, RnaFold},
    fold_gate::FoldGate,
    loop_matcher::{HairpinScanner, MatchParams, MatchPass},
    patterns::PatternSource,
    rna_sequence::RnaSequence,
    sink::ResultSink,
    task::{SequenceTask, TaskMode},
    vienna::ViennaStructure,
};
use anyhow::Result;
use serde::Serialize;
use std::{sync::Arc, thread};

/// Batch-wide flags; per-pass bounds travel in [`MatchParams`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Fold each sequence before matching (gate-throttled) instead of
    /// scanning the raw sequence.
    pub extended: bool,
    pub search_reverse: bool,
    pub params: MatchParams,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatchSummary {
    pub tasks: usize,
    pub gate_permits: usize,
}

pub struct Dispatcher {
    pool: rayon::ThreadPool,
    gate: Arc<FoldGate>,
    gateway: Arc<FoldGateway>,
    matcher: Arc<dyn MatchPass>,
}

impl Dispatcher {
    /// Production dispatcher: process-wide gate sized from the core count,
    /// subprocess fold engine, default scanner.
    pub fn new() -> Result<Self> {
        let cores = thread::available_parallelism().map_or(1, |n| n.get());
        let gate = FoldGate::shared(cores);
        Self::with_parts(gate, Arc::new(RnaFold), Arc::new(HairpinScanner), cores)
    }

    /// Dispatcher over explicit collaborators. The pool caps how many tasks
    /// are live at once, independently of the gate's fold permits.
    pub fn with_parts(
        gate: Arc<FoldGate>,
        engine: Arc<dyn FoldEngine>,
        matcher: Arc<dyn MatchPass>,
        live_tasks: usize,
    ) -> Result<Self> {
        // A panic escaping a spawned task must not abort the process; the
        // task's guard has already counted the barrier down by the time the
        // payload reaches this handler, so the batch keeps going.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(live_tasks.max(1))
            .panic_handler(|_| eprintln!("{}", TRANSLATIONS.get("err_task_panic")))
            .build()?;
        Ok(Self {
            pool,
            gate,
            gateway: Arc::new(FoldGateway::new(engine)),
            matcher,
        })
    }

    pub fn gate(&self) -> &Arc<FoldGate> {
        &self.gate
    }

    /// Runs one task per sequence, each with its own pattern cursor, and
    /// blocks until all of them have signalled the barrier. The sink is
    /// flushed exactly once, afterwards.
    pub fn run_sequences(
        &self,
        jobs: Vec<(RnaSequence, PatternSource)>,
        options: &BatchOptions,
        sink: Arc<dyn ResultSink>,
    ) -> Result<BatchSummary> {
        let tasks = jobs.len();
        let barrier = Arc::new(CompletionBarrier::new(tasks));

        for (sequence, patterns) in jobs {
            let mode = if options.extended {
                TaskMode::Fold {
                    sequence,
                    search_reverse: options.search_reverse,
                    gateway: self.gateway.clone(),
                    gate: self.gate.clone(),
                }
            } else {
                TaskMode::Plain {
                    sequence,
                    search_reverse: options.search_reverse,
                }
            };
            let task = SequenceTask::new(
                mode,
                options.params.clone(),
                patterns,
                self.matcher.clone(),
                sink.clone(),
                CompletionGuard::new(barrier.clone()),
            );
            self.pool.spawn(move || task.run());
        }

        barrier.wait();
        sink.flush()?;
        Ok(BatchSummary {
            tasks,
            gate_permits: self.gate.permits(),
        })
    }

    /// Single pre-supplied structure plus one pattern cursor.
    pub fn run_structure(
        &self,
        vienna: ViennaStructure,
        patterns: PatternSource,
        params: &MatchParams,
        sink: Arc<dyn ResultSink>,
    ) -> Result<BatchSummary> {
        let barrier = Arc::new(CompletionBarrier::new(1));
        let task = SequenceTask::new(
            TaskMode::Supplied { vienna },
            params.clone(),
            patterns,
            self.matcher.clone(),
            sink.clone(),
            CompletionGuard::new(barrier.clone()),
        );
        self.pool.spawn(move || task.run());

        barrier.wait();
        sink.flush()?;
        Ok(BatchSummary {
            tasks: 1,
            gate_permits: self.gate.permits(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_plain_batch_end_to_end() {
        let dispatcher = Dispatcher::with_parts(
            Arc::new(FoldGate::for_cores(2)),
            Arc::new(RnaFold),
            Arc::new(HairpinScanner),
            4,
        )
        .unwrap();

        let jobs = vec![
            (
                RnaSequence::from_sequence("AUGAUG").unwrap(),
                PatternSource::from_slice(&["AUG"]),
            ),
            (
                RnaSequence::from_sequence("GCUGCU").unwrap(),
                PatternSource::from_slice(&["GCU"]),
            ),
        ];
        let sink = Arc::new(MemorySink::new());
        let summary = dispatcher
            .run_sequences(jobs, &BatchOptions::default(), sink.clone())
            .unwrap();

        assert_eq!(summary.tasks, 2);
        assert_eq!(summary.gate_permits, 5);
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn test_structure_run() {
        let dispatcher = Dispatcher::with_parts(
            Arc::new(FoldGate::for_cores(1)),
            Arc::new(RnaFold),
            Arc::new(HairpinScanner),
            2,
        )
        .unwrap();

        let vienna = ViennaStructure::from_text(">hp\nGGGAUGACCC\n(((....)))\n").unwrap();
        let sink = Arc::new(MemorySink::new());
        let summary = dispatcher
            .run_structure(
                vienna,
                PatternSource::from_slice(&["AUG"]),
                &MatchParams::default(),
                sink.clone(),
            )
            .unwrap();

        assert_eq!(summary.tasks, 1);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.rows()[0].sequence_id, "hp");
    }

    #[test]
    fn test_empty_batch_does_not_hang() {
        let dispatcher = Dispatcher::with_parts(
            Arc::new(FoldGate::for_cores(1)),
            Arc::new(RnaFold),
            Arc::new(HairpinScanner),
            2,
        )
        .unwrap();
        let sink = Arc::new(MemorySink::new());
        let summary = dispatcher
            .run_sequences(vec![], &BatchOptions::default(), sink)
            .unwrap();
        assert_eq!(summary.tasks, 0);
    }
}
