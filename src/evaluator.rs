//! Parallel execution harness for the user evaluation function.
//!
//! The user function receives `(worker_id, sample)` and returns a score. It
//! is called concurrently from a pool of workers; the worker id is stable
//! for the duration of one batch so user code can pin per-worker resources.
//! Scores are returned in sample order, not completion order.
//!
//! The backend is a strategy: [`Backend::Threaded`] runs a scoped thread
//! pool, while [`Backend::Sequential`] runs in-line on the control thread
//! for user code that must not be called concurrently. Both backends honor
//! the same ordering and error policy.

use core::fmt;
use core::num::NonZeroUsize;
use core::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::space::Sample;

/// Environment variable overriding the probed hardware parallelism cap.
pub(crate) const WORKERS_ENV: &str = "SHAC_WORKERS";

/// How evaluation (and generation) work is scheduled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// A pool of scoped OS threads (the default).
    #[default]
    Threaded,
    /// In-line execution on the control thread, for user functions that are
    /// not safe to call concurrently.
    Sequential,
}

/// The hardware parallelism cap, honoring the `SHAC_WORKERS` override.
pub(crate) fn worker_cap() -> usize {
    if let Ok(raw) = std::env::var(WORKERS_ENV)
        && let Ok(n) = raw.parse::<usize>()
        && n > 0
    {
        return n;
    }
    thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Resolves the worker count for a batch of `n_tasks`, warning when an
/// explicit request exceeds the available cores.
pub(crate) fn effective_workers(requested: Option<usize>, n_tasks: usize) -> usize {
    let cap = worker_cap();
    let wanted = requested.unwrap_or(cap);
    if wanted > cap {
        tracing::warn!(
            requested = wanted,
            available = cap,
            "requested workers exceed available parallelism, reducing"
        );
    }
    wanted.min(cap).clamp(1, n_tasks.max(1))
}

pub(crate) struct Evaluator {
    backend: Backend,
    workers: usize,
    timeout: Option<Duration>,
    score_on_failure: Option<f64>,
}

impl Evaluator {
    pub(crate) fn new(
        backend: Backend,
        workers: usize,
        timeout: Option<Duration>,
        score_on_failure: Option<f64>,
    ) -> Self {
        Self {
            backend,
            workers,
            timeout,
            score_on_failure,
        }
    }

    /// Evaluates a batch, returning scores in sample order.
    ///
    /// # Errors
    ///
    /// Returns the first evaluation failure or timeout (unless a
    /// `score_on_failure` sentinel is configured), or [`Error::Cancelled`].
    pub(crate) fn run<F, E>(
        &self,
        samples: &[Sample],
        eval_fn: &F,
        cancel: &CancelToken,
    ) -> Result<Vec<f64>>
    where
        F: Fn(usize, &Sample) -> core::result::Result<f64, E> + Sync,
        E: fmt::Display,
    {
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        match self.backend {
            Backend::Sequential => {
                let abort = AtomicBool::new(false);
                self.run_chunk(0, samples, eval_fn, cancel, &abort)
            }
            Backend::Threaded => self.run_threaded(samples, eval_fn, cancel),
        }
    }

    fn run_threaded<F, E>(
        &self,
        samples: &[Sample],
        eval_fn: &F,
        cancel: &CancelToken,
    ) -> Result<Vec<f64>>
    where
        F: Fn(usize, &Sample) -> core::result::Result<f64, E> + Sync,
        E: fmt::Display,
    {
        let workers = self.workers.clamp(1, samples.len());
        let chunk = samples.len().div_ceil(workers);
        // Set on the first failure so sibling workers stop at their next
        // evaluation boundary.
        let abort = AtomicBool::new(false);

        let results: Vec<Result<Vec<f64>>> = thread::scope(|s| {
            let handles: Vec<_> = samples
                .chunks(chunk)
                .enumerate()
                .map(|(worker_id, chunk_samples)| {
                    let abort = &abort;
                    s.spawn(move || {
                        self.run_chunk(worker_id, chunk_samples, eval_fn, cancel, abort)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or(Err(Error::Internal("evaluation worker panicked")))
                })
                .collect()
        });

        // A worker that merely observed the abort flag reports Cancelled;
        // the originating failure takes precedence over those.
        let mut cancelled = false;
        let mut scores = Vec::with_capacity(samples.len());
        let mut chunks = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(chunk_scores) => chunks.push(chunk_scores),
                Err(Error::Cancelled) => cancelled = true,
                Err(e) => return Err(e),
            }
        }
        if cancelled {
            return Err(Error::Cancelled);
        }
        for chunk_scores in chunks {
            scores.extend(chunk_scores);
        }
        Ok(scores)
    }

    fn run_chunk<F, E>(
        &self,
        worker_id: usize,
        samples: &[Sample],
        eval_fn: &F,
        cancel: &CancelToken,
        abort: &AtomicBool,
    ) -> Result<Vec<f64>>
    where
        F: Fn(usize, &Sample) -> core::result::Result<f64, E> + Sync,
        E: fmt::Display,
    {
        let mut scores = Vec::with_capacity(samples.len());
        for sample in samples {
            if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
                return Err(Error::Cancelled);
            }
            match self.evaluate_one(worker_id, sample, eval_fn) {
                Ok(score) => scores.push(score),
                Err(e) => {
                    abort.store(true, Ordering::SeqCst);
                    return Err(e);
                }
            }
        }
        Ok(scores)
    }

    /// One evaluation, with the timeout observed at the call boundary and
    /// the failure sentinel applied when configured.
    fn evaluate_one<F, E>(
        &self,
        worker_id: usize,
        sample: &Sample,
        eval_fn: &F,
    ) -> Result<f64>
    where
        F: Fn(usize, &Sample) -> core::result::Result<f64, E> + Sync,
        E: fmt::Display,
    {
        let started = Instant::now();
        let outcome = eval_fn(worker_id, sample);
        let elapsed = started.elapsed();

        let failure = match outcome {
            Ok(score) => {
                if let Some(limit) = self.timeout
                    && elapsed > limit
                {
                    Error::EvaluationTimeout {
                        elapsed_ms: elapsed.as_millis(),
                        limit_ms: limit.as_millis(),
                    }
                } else {
                    return Ok(score);
                }
            }
            Err(e) => Error::Evaluation {
                message: e.to_string(),
            },
        };

        match self.score_on_failure {
            Some(sentinel) => {
                tracing::warn!(worker_id, %sample, error = %failure, sentinel, "evaluation failed, recording sentinel score");
                Ok(sentinel)
            }
            None => Err(failure),
        }
    }
}
