//! Binary classifiers over encoded parameter vectors.
//!
//! The engine treats classifiers as an opaque capability: fit on a labeled
//! set of encoded vectors, predict accept/reject for new vectors,
//! deterministic given a seed, serializable for checkpoints. Any model with
//! this contract can be used; the default is the bagged decision-tree
//! ensemble in [`forest`].

pub mod forest;

use serde::{Deserialize, Serialize};

use crate::dataset::stratified_kfold;
use crate::error::Result;

/// The capability the engine requires of a binary classifier.
///
/// Implementations must be `Send + Sync` so a trained classifier can be
/// shared with generation workers, and must produce identical models for
/// identical `(data, labels, seed)` inputs.
pub trait Classifier: Send + Sync {
    /// Fits the classifier on encoded vectors and accept/reject labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the training set is empty or inconsistently
    /// shaped.
    fn fit(&mut self, data: &[Vec<f64>], labels: &[bool], seed: u64) -> Result<()>;

    /// Predicts the accept/reject label for one encoded vector.
    fn predict_one(&self, features: &[f64]) -> bool;

    /// Predicts labels for a batch of encoded vectors.
    fn predict(&self, data: &[Vec<f64>]) -> Vec<bool> {
        data.iter().map(|row| self.predict_one(row)).collect()
    }
}

/// Metadata recorded for each classifier committed to the cascade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierMeta {
    /// Position in the cascade (0-based).
    pub version: usize,
    /// Number of samples the classifier was trained on.
    pub trained_on: usize,
    /// Mean held-out accuracy from cross-validation, when it ran.
    pub validation_accuracy: Option<f64>,
}

/// Result of [`cross_validate`].
pub(crate) enum CvOutcome {
    /// All folds were trainable; mean held-out accuracy attached.
    Valid { accuracy: f64 },
    /// Some fold's training part lacked both classes; the batch is not
    /// discriminative enough to train on.
    Untrainable,
}

/// K-fold cross-validation of a candidate classifier.
///
/// Folds are stratified on the labels. Any fold whose training part lacks
/// both classes makes the whole batch untrainable. Empty validation folds
/// (possible when the batch is barely larger than `k`) are skipped when
/// averaging.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn cross_validate<C: Classifier + Default>(
    data: &[Vec<f64>],
    labels: &[bool],
    k: usize,
    seed: u64,
) -> Result<CvOutcome> {
    let mut fold_accuracies = Vec::with_capacity(k);

    for (fold, (train_idx, val_idx)) in stratified_kfold(labels, k, seed).into_iter().enumerate() {
        let has_both = train_idx.iter().any(|&i| labels[i])
            && train_idx.iter().any(|&i| !labels[i]);
        if !has_both {
            return Ok(CvOutcome::Untrainable);
        }
        if val_idx.is_empty() {
            continue;
        }

        let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| data[i].clone()).collect();
        let train_y: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();

        let mut model = C::default();
        model.fit(&train_x, &train_y, seed.wrapping_add(fold as u64))?;

        let correct = val_idx
            .iter()
            .filter(|&&i| model.predict_one(&data[i]) == labels[i])
            .count();
        fold_accuracies.push(correct as f64 / val_idx.len() as f64);
    }

    if fold_accuracies.is_empty() {
        return Ok(CvOutcome::Untrainable);
    }
    Ok(CvOutcome::Valid {
        accuracy: fold_accuracies.iter().sum::<f64>() / fold_accuracies.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::forest::ForestClassifier;
    use super::*;

    fn separable_batch(n: usize) -> (Vec<Vec<f64>>, Vec<bool>) {
        #[allow(clippy::cast_precision_loss)]
        let data: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64]).collect();
        let labels: Vec<bool> = (0..n).map(|i| i < n / 2).collect();
        (data, labels)
    }

    #[test]
    fn cv_scores_a_separable_batch_highly() {
        let (data, labels) = separable_batch(40);
        let outcome = cross_validate::<ForestClassifier>(&data, &labels, 5, 0).unwrap();
        match outcome {
            CvOutcome::Valid { accuracy } => {
                assert!(accuracy > 0.8, "accuracy = {accuracy}");
            }
            CvOutcome::Untrainable => panic!("separable batch should be trainable"),
        }
    }

    #[test]
    fn cv_flags_single_class_folds_untrainable() {
        // One positive among 10: every 5-fold training part that misses it
        // has a single class.
        let data: Vec<Vec<f64>> = (0..10).map(|i| vec![f64::from(i)]).collect();
        let mut labels = vec![false; 10];
        labels[0] = true;
        let outcome = cross_validate::<ForestClassifier>(&data, &labels, 5, 0).unwrap();
        assert!(matches!(outcome, CvOutcome::Untrainable));
    }

    #[test]
    fn cv_is_deterministic() {
        let (data, labels) = separable_batch(30);
        let a = cross_validate::<ForestClassifier>(&data, &labels, 5, 3).unwrap();
        let b = cross_validate::<ForestClassifier>(&data, &labels, 5, 3).unwrap();
        match (a, b) {
            (CvOutcome::Valid { accuracy: x }, CvOutcome::Valid { accuracy: y }) => {
                assert!((x - y).abs() < f64::EPSILON);
            }
            _ => panic!("expected valid outcomes"),
        }
    }
}
