//! Parallel rejection sampler over the classifier cascade.
//!
//! The generator produces samples distributed as "uniform over the search
//! space, conditioned on every classifier in the cascade accepting". Each
//! output slot repeatedly draws a raw sample, encodes it, and runs the
//! cascade in order; the first candidate accepted by all classifiers fills
//! the slot. Under the halving invariant each classifier rejects about half
//! of the candidates that survive the previous ones, so expected attempts
//! per accepted sample grow as `2^cascade_len`.
//!
//! Slots are assigned to workers in contiguous chunks and every slot owns an
//! independent RNG stream seeded from `(engine_seed, stream, slot)`, so the
//! batch is ordered by slot and byte-identical for a fixed seed regardless
//! of worker count or completion order.

use std::thread;

use crate::cancel::CancelToken;
use crate::classifier::Classifier;
use crate::error::{Error, Result};
use crate::rng_util;
use crate::space::{Sample, SearchSpace};

/// Stream tag used by `predict`, distinct from every training epoch.
pub(crate) const PREDICT_STREAM: u64 = u64::MAX;

pub(crate) struct Generator<'a, C> {
    space: &'a SearchSpace,
    cascade: &'a [C],
    max_attempts: u64,
    workers: usize,
}

impl<'a, C: Classifier> Generator<'a, C> {
    pub(crate) fn new(
        space: &'a SearchSpace,
        cascade: &'a [C],
        max_attempts: u64,
        workers: usize,
    ) -> Self {
        Self {
            space,
            cascade,
            max_attempts,
            workers,
        }
    }

    /// Produces `n` accepted samples, ordered by slot.
    ///
    /// `stream` separates training epochs from each other and from
    /// prediction draws; with a fixed `(engine_seed, stream)` the output is
    /// reproducible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeneratorExhausted`] if any slot exceeds the attempt
    /// cap, or [`Error::Cancelled`] if the token fires mid-batch.
    pub(crate) fn generate(
        &self,
        n: usize,
        engine_seed: u64,
        stream: u64,
        cancel: &CancelToken,
    ) -> Result<Vec<Sample>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let expected = 2f64.powi(self.cascade.len() as i32);
        tracing::debug!(
            cascade_len = self.cascade.len(),
            expected_attempts_per_sample = expected,
            "rejection sampling"
        );

        let workers = self.workers.clamp(1, n);
        let chunk = n.div_ceil(workers);

        let results: Vec<Result<(Vec<Sample>, u64)>> = thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    let lo = w * chunk;
                    let hi = ((w + 1) * chunk).min(n);
                    s.spawn(move || self.fill_slots(lo..hi, engine_seed, stream, cancel))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| {
                    h.join()
                        .unwrap_or(Err(Error::Internal("generation worker panicked")))
                })
                .collect()
        });

        let mut samples = Vec::with_capacity(n);
        let mut total_attempts = 0;
        let mut cancelled = false;
        for result in results {
            match result {
                Ok((chunk_samples, attempts)) => {
                    samples.extend(chunk_samples);
                    total_attempts += attempts;
                }
                Err(Error::Cancelled) => cancelled = true,
                Err(e) => return Err(e),
            }
        }
        if cancelled {
            return Err(Error::Cancelled);
        }

        tracing::debug!(n, total_attempts, "batch generated");
        Ok(samples)
    }

    fn fill_slots(
        &self,
        slots: core::ops::Range<usize>,
        engine_seed: u64,
        stream: u64,
        cancel: &CancelToken,
    ) -> Result<(Vec<Sample>, u64)> {
        let mut samples = Vec::with_capacity(slots.len());
        let mut total_attempts = 0;
        for slot in slots {
            let (sample, attempts) = self.fill_one(slot, engine_seed, stream, cancel)?;
            samples.push(sample);
            total_attempts += attempts;
        }
        Ok((samples, total_attempts))
    }

    fn fill_one(
        &self,
        slot: usize,
        engine_seed: u64,
        stream: u64,
        cancel: &CancelToken,
    ) -> Result<(Sample, u64)> {
        let seed = rng_util::derive_seed(engine_seed, stream, slot as u64);
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut attempts = 0u64;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            if attempts >= self.max_attempts {
                return Err(Error::GeneratorExhausted { attempts });
            }
            attempts += 1;

            let sample = self.space.sample(&mut rng);
            if self.cascade.is_empty() {
                return Ok((sample, attempts));
            }
            let encoded = self.space.encode(&sample)?;
            if self.cascade.iter().all(|c| c.predict_one(&encoded)) {
                return Ok((sample, attempts));
            }
        }
    }
}
