//! The SHAC training engine.
//!
//! Training proceeds in epochs. Each epoch the engine asks the
//! [`Generator`](crate::generator) for a batch of samples accepted by the
//! current classifier cascade, evaluates them in parallel, labels the best
//! half of the batch as accepted, trains one more classifier on those
//! labels, and checkpoints. Prediction draws samples through the full
//! cascade without evaluating or mutating anything.
//!
//! # Example
//!
//! ```no_run
//! use shac::{Direction, Parameter, SearchSpace, ShacConfig, ShacEngine};
//!
//! let space = SearchSpace::new(vec![
//!     Parameter::uniform("x", -5.0, 5.0),
//!     Parameter::uniform("y", -2.0, 2.0),
//! ])
//! .unwrap();
//!
//! let config = ShacConfig::new(100, 10)
//!     .objective(Direction::Minimize)
//!     .seed(0);
//! let mut engine: ShacEngine = ShacEngine::new(space, config);
//!
//! engine
//!     .fit(|_worker, sample| {
//!         let x = sample.f64("x").unwrap();
//!         let y = sample.f64("y").unwrap();
//!         Ok::<_, shac::Error>((2.0 * x - y - 4.0).powi(2))
//!     })
//!     .unwrap();
//!
//! let candidates = engine.predict(20).unwrap();
//! # let _ = candidates;
//! ```

use core::fmt;
use core::time::Duration;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cancel::CancelToken;
use crate::classifier::forest::ForestClassifier;
use crate::classifier::{Classifier, ClassifierMeta, CvOutcome, cross_validate};
use crate::dataset::{Dataset, Record, quantile_threshold};
use crate::error::{Error, Result};
use crate::evaluator::{Backend, Evaluator, effective_workers};
use crate::generator::{Generator, PREDICT_STREAM};
use crate::persist::{self, Flags, Meta};
use crate::rng_util;
use crate::space::{Sample, SearchSpace};
use crate::types::{Direction, EpochOutcome};

/// Number of cross-validation folds used to vet a candidate classifier.
const CV_FOLDS: usize = 5;

/// The fraction of each batch labeled accepted (the halving quantile).
const ACCEPT_QUANTILE: f64 = 0.5;

/// Stream slot reserved for classifier training seeds, far above any
/// generation slot index.
const TRAIN_SLOT: u64 = u64::MAX;

/// Configuration of a [`ShacEngine`].
///
/// | Option | Default | Description |
/// |--------|---------|-------------|
/// | `total_budget` | — | Total user-function evaluations across all epochs |
/// | `num_batches` | — | Samples per epoch; should divide `total_budget` |
/// | `objective` | `Minimize` | Whether lower or higher scores are better |
/// | `max_classifiers` | 18 | Hard cap on cascade length |
/// | `skip_cv_checks` | `false` | Fit candidates once, without cross-validation |
/// | `early_stop` | `false` | Halt training when a classifier fails to be added |
/// | `relax_checks` | `false` | Add candidates even if the cascade gate fails |
/// | `seed` | random | Engine seed for reproducible runs |
/// | `workers` | probed | Worker count for generation and evaluation pools |
/// | `max_attempts_per_slot` | 100 000 | Rejection-sampling cap per output sample |
/// | `score_on_failure` | `None` | Sentinel score recorded instead of failing the epoch |
/// | `eval_timeout` | `None` | Per-evaluation time limit |
/// | `backend` | `Threaded` | Evaluation scheduling strategy |
#[derive(Clone, Debug)]
pub struct ShacConfig {
    total_budget: usize,
    num_batches: usize,
    objective: Direction,
    max_classifiers: usize,
    skip_cv_checks: bool,
    early_stop: bool,
    relax_checks: bool,
    seed: Option<u64>,
    workers: Option<usize>,
    max_attempts_per_slot: u64,
    score_on_failure: Option<f64>,
    eval_timeout: Option<Duration>,
    backend: Backend,
}

impl ShacConfig {
    /// Creates a configuration with the given budget and batch size.
    ///
    /// # Panics
    ///
    /// Panics if `total_budget` or `num_batches` is zero.
    #[must_use]
    pub fn new(total_budget: usize, num_batches: usize) -> Self {
        assert!(total_budget > 0, "total_budget must be > 0");
        assert!(num_batches > 0, "num_batches must be > 0");
        Self {
            total_budget,
            num_batches,
            objective: Direction::Minimize,
            max_classifiers: 18,
            skip_cv_checks: false,
            early_stop: false,
            relax_checks: false,
            seed: None,
            workers: None,
            max_attempts_per_slot: 100_000,
            score_on_failure: None,
            eval_timeout: None,
            backend: Backend::default(),
        }
    }

    /// Sets the optimization direction.
    #[must_use]
    pub fn objective(mut self, objective: Direction) -> Self {
        self.objective = objective;
        self
    }

    /// Caps the cascade length. Zero disables classifier training entirely,
    /// leaving pure uniform sampling.
    #[must_use]
    pub fn max_classifiers(mut self, n: usize) -> Self {
        self.max_classifiers = n;
        self
    }

    /// Fits candidate classifiers once, without cross-validation.
    #[must_use]
    pub fn skip_cv_checks(mut self, skip: bool) -> Self {
        self.skip_cv_checks = skip;
        self
    }

    /// Halts training as soon as an epoch fails to add a classifier.
    #[must_use]
    pub fn early_stop(mut self, stop: bool) -> Self {
        self.early_stop = stop;
        self
    }

    /// Adds candidate classifiers even when the cascade-acceptance gate
    /// fails.
    #[must_use]
    pub fn relax_checks(mut self, relax: bool) -> Self {
        self.relax_checks = relax;
        self
    }

    /// Fixes the engine seed for reproducible runs.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the worker count for generation and evaluation pools. Values
    /// above the available parallelism are reduced with a warning.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Sets the per-slot rejection-sampling cap.
    ///
    /// # Panics
    ///
    /// Panics if `cap` is zero.
    #[must_use]
    pub fn max_attempts_per_slot(mut self, cap: u64) -> Self {
        assert!(cap > 0, "max_attempts_per_slot must be > 0");
        self.max_attempts_per_slot = cap;
        self
    }

    /// Records the given score instead of halting when an evaluation fails
    /// or times out.
    #[must_use]
    pub fn score_on_failure(mut self, score: f64) -> Self {
        self.score_on_failure = Some(score);
        self
    }

    /// Sets a per-evaluation time limit, observed at the evaluation
    /// boundary.
    #[must_use]
    pub fn eval_timeout(mut self, limit: Duration) -> Self {
        self.eval_timeout = Some(limit);
        self
    }

    /// Selects the evaluation backend.
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }
}

/// The SHAC search engine.
///
/// Generic over the classifier implementation; the default is the bagged
/// tree ensemble [`ForestClassifier`]. See the [module docs](self) for a
/// worked example.
pub struct ShacEngine<C = ForestClassifier> {
    space: SearchSpace,
    config: ShacConfig,
    dataset: Dataset,
    cascade: Vec<C>,
    cascade_meta: Vec<ClassifierMeta>,
    epochs_completed: u64,
    checkpoint_dir: PathBuf,
    cancel: CancelToken,
    /// The resolved seed; every RNG stream in the engine derives from it.
    seed: u64,
}

impl<C: Classifier> ShacEngine<C> {
    /// Creates an untrained engine over the given space.
    #[must_use]
    pub fn new(space: SearchSpace, config: ShacConfig) -> Self {
        let seed = config.seed.unwrap_or_else(|| fastrand::u64(..));
        Self {
            space,
            config,
            dataset: Dataset::new(),
            cascade: Vec::new(),
            cascade_meta: Vec::new(),
            epochs_completed: 0,
            checkpoint_dir: PathBuf::from(persist::DEFAULT_DIR),
            cancel: CancelToken::new(),
            seed,
        }
    }

    /// Sets the checkpoint directory (default `shac/`).
    #[must_use]
    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint_dir = dir.into();
        self
    }

    /// The search space this engine samples from.
    #[must_use]
    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// All evaluated samples so far.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The best evaluated record under the configured objective.
    #[must_use]
    pub fn best(&self) -> Option<&Record> {
        self.dataset.best(self.config.objective)
    }

    /// The classifiers committed to the cascade, in training order.
    #[must_use]
    pub fn cascade(&self) -> &[C] {
        &self.cascade
    }

    /// Current cascade length.
    #[must_use]
    pub fn cascade_len(&self) -> usize {
        self.cascade.len()
    }

    /// Metadata for each classifier committed to the cascade.
    #[must_use]
    pub fn cascade_meta(&self) -> &[ClassifierMeta] {
        &self.cascade_meta
    }

    /// Number of fully completed epochs.
    #[must_use]
    pub fn epochs_completed(&self) -> u64 {
        self.epochs_completed
    }

    /// A handle that cancels training from another thread.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Batch sizes per epoch. The budget is spent in `num_batches`-sized
    /// epochs; a budget smaller than one batch yields a single truncated
    /// epoch, and a trailing remainder is dropped.
    fn epoch_plan(&self) -> Vec<usize> {
        let full = self.config.total_budget / self.config.num_batches;
        if full == 0 {
            vec![self.config.total_budget]
        } else {
            vec![self.config.num_batches; full]
        }
    }

    /// Draws `n` samples through the full cascade.
    ///
    /// Pure: repeated calls return the same samples for a fixed seed, and
    /// neither the dataset nor the cascade is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeneratorExhausted`] if the cascade is too selective
    /// for the attempt cap.
    pub fn predict(&self, n: usize) -> Result<Vec<Sample>> {
        self.predict_truncated(n, self.cascade.len())
    }

    /// Like [`predict`](Self::predict) but runs at most `max_classifiers`
    /// cascade entries.
    ///
    /// # Errors
    ///
    /// See [`predict`](Self::predict).
    pub fn predict_truncated(&self, n: usize, max_classifiers: usize) -> Result<Vec<Sample>> {
        let cascade = &self.cascade[..max_classifiers.min(self.cascade.len())];
        let workers = effective_workers(self.config.workers, n);
        Generator::new(&self.space, cascade, self.config.max_attempts_per_slot, workers)
            .generate(n, self.seed, PREDICT_STREAM, &self.cancel)
    }
}

impl<C: Classifier + Default + Serialize> ShacEngine<C> {
    /// Trains until the budget is exhausted or the engine halts.
    ///
    /// Each epoch generates one batch through the cascade, evaluates it with
    /// `eval_fn(worker_id, sample)`, labels the best half accepted, trains a
    /// classifier on the labels, and checkpoints. Whenever the engine halts
    /// (generator exhaustion, evaluation failure, cancellation) the
    /// checkpoint reflects all fully completed epochs and the current epoch
    /// is discarded.
    ///
    /// # Errors
    ///
    /// Returns the halting condition, or [`Error::Persistence`] if a
    /// checkpoint cannot be written. An early stop is a normal return.
    pub fn fit<F, E>(&mut self, eval_fn: F) -> Result<()>
    where
        F: Fn(usize, &Sample) -> core::result::Result<f64, E> + Sync,
        E: fmt::Display,
    {
        let _span = tracing::info_span!(
            "fit",
            total_budget = self.config.total_budget,
            num_batches = self.config.num_batches,
            seed = self.seed,
        )
        .entered();

        let plan = self.epoch_plan();
        if self.config.total_budget % self.config.num_batches != 0 {
            tracing::warn!(
                total_budget = self.config.total_budget,
                num_batches = self.config.num_batches,
                effective = plan.iter().sum::<usize>(),
                "num_batches does not divide total_budget evenly, rounding down"
            );
        }

        let workers = effective_workers(self.config.workers, self.config.num_batches);
        let evaluator = Evaluator::new(
            self.config.backend,
            workers,
            self.config.eval_timeout,
            self.config.score_on_failure,
        );

        while (self.epochs_completed as usize) < plan.len() {
            let epoch = self.epochs_completed;
            #[allow(clippy::cast_possible_truncation)]
            let batch_size = plan[epoch as usize];
            let _epoch_span = tracing::info_span!("epoch", epoch, batch_size).entered();

            if self.cancel.is_cancelled() {
                return self.halt(Error::Cancelled);
            }

            // Generating
            let generated = Generator::new(
                &self.space,
                &self.cascade,
                self.config.max_attempts_per_slot,
                workers,
            )
            .generate(batch_size, self.seed, epoch, &self.cancel);
            let samples = match generated {
                Ok(samples) => samples,
                Err(e) => return self.halt(e),
            };

            // Evaluating
            let scores = match evaluator.run(&samples, &eval_fn, &self.cancel) {
                Ok(scores) => scores,
                Err(e) => return self.halt(e),
            };

            // Labeling: the best half of this batch (not global history) is
            // accepted, so the new classifier rejects ~50% of samples drawn
            // from the current-cascade distribution.
            let threshold = quantile_threshold(&scores, ACCEPT_QUANTILE, self.config.objective)
                .ok_or(Error::Internal("epoch batch was empty"))?;
            let labels: Vec<bool> = scores
                .iter()
                .map(|&s| self.config.objective.accepts(s, threshold))
                .collect();

            for (sample, &score) in samples.iter().zip(&scores) {
                self.dataset.push(sample.clone(), score);
            }

            // Training
            let outcome = self.train_step(&samples, &labels, epoch)?;

            // Persisting
            self.epochs_completed += 1;
            self.save(&self.checkpoint_dir)?;
            tracing::info!(
                epoch,
                ?outcome,
                threshold,
                cascade_len = self.cascade.len(),
                dataset_len = self.dataset.len(),
                "epoch complete"
            );

            if self.config.early_stop && outcome.is_stall() {
                tracing::info!(epoch, "early stop: no classifier added");
                break;
            }
        }

        Ok(())
    }

    /// Trains this epoch's candidate classifier and, if it passes the
    /// checks, appends it to the cascade.
    fn train_step(
        &mut self,
        samples: &[Sample],
        labels: &[bool],
        epoch: u64,
    ) -> Result<EpochOutcome> {
        if self.cascade.len() >= self.config.max_classifiers {
            return Ok(EpochOutcome::CascadeFull);
        }

        let positives = labels.iter().filter(|&&l| l).count();
        let negatives = labels.len() - positives;
        if positives < 2 || negatives < 2 {
            tracing::warn!(
                epoch,
                positives,
                negatives,
                "batch has fewer than 2 samples of one label, skipping classifier"
            );
            return Ok(EpochOutcome::TooFewLabels);
        }

        let data: Vec<Vec<f64>> = samples
            .iter()
            .map(|s| self.space.encode(s))
            .collect::<Result<_>>()?;
        let train_seed = rng_util::derive_seed(self.seed, epoch, TRAIN_SLOT);

        let mut validation_accuracy = None;
        if !self.config.skip_cv_checks {
            match cross_validate::<C>(&data, labels, CV_FOLDS, train_seed)? {
                CvOutcome::Untrainable => {
                    tracing::warn!(epoch, "cross-validation fold lacked both classes, classifier untrainable");
                    return Ok(EpochOutcome::Untrainable);
                }
                CvOutcome::Valid { accuracy } => validation_accuracy = Some(accuracy),
            }
        }

        let mut candidate = C::default();
        candidate.fit(&data, labels, train_seed)?;

        // Acceptance validity gate: the updated cascade must still select a
        // non-empty subset of this batch's accepted samples.
        if !self.config.relax_checks {
            let survives = data
                .iter()
                .zip(labels)
                .filter(|&(_, &accepted)| accepted)
                .any(|(row, _)| {
                    candidate.predict_one(row) && self.cascade.iter().all(|c| c.predict_one(row))
                });
            if !survives {
                tracing::warn!(epoch, "cascade stalled: updated cascade rejects every accepted sample");
                return Ok(EpochOutcome::CascadeStalled);
            }
        }

        self.cascade_meta.push(ClassifierMeta {
            version: self.cascade.len(),
            trained_on: labels.len(),
            validation_accuracy,
        });
        self.cascade.push(candidate);
        Ok(EpochOutcome::ClassifierAdded)
    }

    /// Persists the completed-epoch state and returns the halting error.
    fn halt(&self, error: Error) -> Result<()> {
        tracing::warn!(error = %error, epochs_completed = self.epochs_completed, "halting");
        if let Err(save_error) = self.save(&self.checkpoint_dir) {
            tracing::error!(error = %save_error, "failed to persist checkpoint while halting");
        }
        Err(error)
    }

    /// Writes a checkpoint of the current state to `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] on I/O failure; a previously written
    /// checkpoint stays intact.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        persist::save_checkpoint(
            dir.as_ref(),
            &self.meta(),
            &self.space,
            &self.dataset,
            &self.cascade,
        )
    }

    fn meta(&self) -> Meta {
        Meta {
            engine_version: persist::ENGINE_VERSION,
            epoch: self.epochs_completed,
            objective: self.config.objective,
            total_budget: self.config.total_budget,
            num_batches: self.config.num_batches,
            max_classifiers: self.config.max_classifiers,
            seed: self.seed,
            flags: Flags {
                skip_cv_checks: self.config.skip_cv_checks,
                early_stop: self.config.early_stop,
                relax_checks: self.config.relax_checks,
            },
            classifiers: self.cascade_meta.clone(),
        }
    }
}

impl<C: Classifier + DeserializeOwned> ShacEngine<C> {
    /// Restores an engine from a checkpoint directory.
    ///
    /// The restored engine continues training from the recorded epoch and
    /// produces the same subsequent samples and predictions as the engine
    /// that wrote the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if any checkpoint file is missing or
    /// unreadable, or [`Error::SchemaMismatch`] if the stored dataset
    /// conflicts with the parameter schema.
    pub fn restore(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let (meta, space, dataset, cascade) = persist::load_checkpoint::<C>(dir)?;

        let mut config = ShacConfig::new(meta.total_budget, meta.num_batches)
            .objective(meta.objective)
            .max_classifiers(meta.max_classifiers)
            .skip_cv_checks(meta.flags.skip_cv_checks)
            .early_stop(meta.flags.early_stop)
            .relax_checks(meta.flags.relax_checks);
        config.seed = Some(meta.seed);

        let engine = Self {
            space,
            config,
            dataset,
            cascade,
            cascade_meta: meta.classifiers,
            epochs_completed: meta.epoch,
            checkpoint_dir: dir.to_path_buf(),
            cancel: CancelToken::new(),
            seed: meta.seed,
        };

        #[allow(clippy::cast_possible_truncation)]
        let expected: usize = engine
            .epoch_plan()
            .iter()
            .take(meta.epoch as usize)
            .sum();
        if engine.dataset.len() != expected {
            return Err(Error::SchemaMismatch(format!(
                "dataset has {} rows but {} completed epochs imply {expected}",
                engine.dataset.len(),
                meta.epoch
            )));
        }

        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::Parameter;

    fn space_1d() -> SearchSpace {
        SearchSpace::new(vec![Parameter::uniform("x", 0.0, 10.0)]).unwrap()
    }

    fn loss(sample: &Sample) -> core::result::Result<f64, Error> {
        Ok((sample.f64("x").unwrap() - 3.0).powi(2))
    }

    #[test]
    fn fit_consumes_the_budget() {
        let config = ShacConfig::new(40, 10).seed(0).skip_cv_checks(true);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("budget"));
        engine.fit(|_, s| loss(s)).unwrap();

        assert_eq!(engine.dataset().len(), 40);
        assert_eq!(engine.epochs_completed(), 4);
        assert!(engine.cascade_len() <= 4);
        cleanup(engine);
    }

    #[test]
    fn truncated_epoch_when_budget_below_batch() {
        let config = ShacConfig::new(5, 10).seed(0);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("truncated"));
        engine.fit(|_, s| loss(s)).unwrap();

        assert_eq!(engine.dataset().len(), 5);
        assert_eq!(engine.epochs_completed(), 1);
        cleanup(engine);
    }

    #[test]
    fn remainder_budget_is_dropped_with_floor() {
        let config = ShacConfig::new(25, 10).seed(0).skip_cv_checks(true);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("floor"));
        engine.fit(|_, s| loss(s)).unwrap();

        assert_eq!(engine.dataset().len(), 20);
        assert_eq!(engine.epochs_completed(), 2);
        cleanup(engine);
    }

    #[test]
    fn zero_max_classifiers_is_pure_uniform() {
        let config = ShacConfig::new(30, 10).seed(0).max_classifiers(0);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("nocls"));
        engine.fit(|_, s| loss(s)).unwrap();

        assert_eq!(engine.cascade_len(), 0);
        assert_eq!(engine.dataset().len(), 30);
        cleanup(engine);
    }

    #[test]
    fn constant_scores_skip_the_classifier() {
        // Every score equal: the whole batch is accepted, so no negative
        // labels exist and no classifier can be trained.
        let config = ShacConfig::new(20, 10).seed(0);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("const"));
        engine.fit(|_, _| Ok::<_, Error>(1.0)).unwrap();

        assert_eq!(engine.cascade_len(), 0);
        assert_eq!(engine.dataset().len(), 20);
        cleanup(engine);
    }

    #[test]
    fn early_stop_halts_on_skipped_classifier() {
        let config = ShacConfig::new(50, 10).seed(0).early_stop(true);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("earlystop"));
        engine.fit(|_, _| Ok::<_, Error>(1.0)).unwrap();

        // First epoch fails to add a classifier and stops training.
        assert_eq!(engine.epochs_completed(), 1);
        assert_eq!(engine.dataset().len(), 10);
        cleanup(engine);
    }

    #[test]
    fn predict_is_pure() {
        let config = ShacConfig::new(20, 10).seed(3).skip_cv_checks(true);
        let mut engine: ShacEngine = ShacEngine::new(space_1d(), config)
            .checkpoint_dir(test_dir("pure"));
        engine.fit(|_, s| loss(s)).unwrap();

        let len_before = engine.dataset().len();
        let cascade_before = engine.cascade_len();
        let a = engine.predict(15).unwrap();
        let b = engine.predict(15).unwrap();

        assert_eq!(a, b);
        assert_eq!(engine.dataset().len(), len_before);
        assert_eq!(engine.cascade_len(), cascade_before);
        cleanup(engine);
    }

    #[test]
    fn predict_on_untrained_engine_is_uniform() {
        let config = ShacConfig::new(10, 10).seed(0);
        let engine: ShacEngine = ShacEngine::new(space_1d(), config);
        let samples = engine.predict(25).unwrap();
        assert_eq!(samples.len(), 25);
        for s in &samples {
            assert!((0.0..10.0).contains(&s.f64("x").unwrap()));
        }
    }

    #[test]
    fn cancellation_halts_and_persists() {
        let dir = test_dir("cancel");
        let config = ShacConfig::new(40, 10).seed(0);
        let mut engine: ShacEngine =
            ShacEngine::new(space_1d(), config).checkpoint_dir(&dir);
        engine.cancel_token().cancel();

        let result = engine.fit(|_, s| loss(s));
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(engine.dataset().len(), 0);
        assert!(dir.join("meta.json").exists());
        cleanup(engine);
    }

    fn test_dir(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("shac_engine_test_{}_{tag}", std::process::id()));
        path
    }

    fn cleanup<C: Classifier>(engine: ShacEngine<C>) {
        std::fs::remove_dir_all(&engine.checkpoint_dir).ok();
    }
}
