//! Core types for the search engine.

use serde::{Deserialize, Serialize};

/// The direction of optimization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Lower scores are better.
    Minimize,
    /// Higher scores are better.
    Maximize,
}

impl Direction {
    /// Returns `true` if `score` is accepted under `threshold` for this direction.
    #[must_use]
    pub fn accepts(self, score: f64, threshold: f64) -> bool {
        match self {
            Direction::Minimize => score <= threshold,
            Direction::Maximize => score >= threshold,
        }
    }

    /// Returns `true` if `a` is a strictly better score than `b`.
    #[must_use]
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Minimize => a < b,
            Direction::Maximize => a > b,
        }
    }
}

/// What the training step did with an epoch's candidate classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EpochOutcome {
    /// A classifier was trained and appended to the cascade.
    ClassifierAdded,
    /// The batch had fewer than two samples of one label; no classifier was trained.
    TooFewLabels,
    /// A cross-validation fold lacked both classes; the candidate was discarded.
    Untrainable,
    /// The candidate failed the cascade-acceptance gate and was discarded.
    CascadeStalled,
    /// The cascade already holds `max_classifiers` entries.
    CascadeFull,
}

impl EpochOutcome {
    /// Whether this outcome counts as "a classifier failed to be added" for
    /// the purposes of the early-stop flag.
    ///
    /// A full cascade is not a failure: evaluation is expected to continue
    /// spending budget without growing the cascade.
    #[must_use]
    pub(crate) fn is_stall(self) -> bool {
        matches!(
            self,
            EpochOutcome::TooFewLabels | EpochOutcome::Untrainable | EpochOutcome::CascadeStalled
        )
    }
}
