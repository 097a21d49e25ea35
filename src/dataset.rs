//! Append-only store of evaluated samples.
//!
//! The [`Dataset`] holds one [`Record`] per user-function evaluation in
//! append order. Records are never mutated in place. Besides storage it
//! provides the labeling machinery of the halving step: quantile
//! [`threshold`](Dataset::threshold) computation, boolean
//! [`labels`](Dataset::labels), and a label-stratified k-fold partition for
//! classifier cross-validation.
//!
//! On disk a dataset is a human-readable CSV (`dataset.csv`): the header row
//! is the parameter names plus `score`, one row per evaluated sample in
//! append order.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parameter::{ParamValue, Parameter, ValueKind};
use crate::space::{Sample, SearchSpace};
use crate::types::Direction;

/// One evaluated sample and its score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// The decoded sample that was evaluated.
    pub sample: Sample,
    /// The score returned by the user function (loss or reward).
    pub score: f64,
}

/// An append-only list of `(sample, score)` records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    /// Creates an empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Appends one record. O(1).
    pub fn push(&mut self, sample: Sample, score: f64) {
        self.records.push(Record { sample, score });
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in append order.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The most recent `n` records (fewer if the dataset is smaller).
    #[must_use]
    pub fn tail(&self, n: usize) -> &[Record] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// All scores in append order.
    #[must_use]
    pub fn scores(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.score).collect()
    }

    /// The best record under `direction`, if any.
    #[must_use]
    pub fn best(&self, direction: Direction) -> Option<&Record> {
        self.records.iter().reduce(|best, r| {
            if direction.is_better(r.score, best.score) {
                r
            } else {
                best
            }
        })
    }

    /// Mean score, if any records are stored.
    #[must_use]
    pub fn mean_score(&self) -> Option<f64> {
        if self.records.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = self.records.iter().map(|r| r.score).sum::<f64>() / self.records.len() as f64;
        Some(mean)
    }

    /// The acceptance threshold at quantile `p` over all stored scores.
    ///
    /// For [`Direction::Minimize`] this is the p-quantile: a sample is
    /// accepted iff `score <= threshold`. For [`Direction::Maximize`] it is
    /// the (1-p)-quantile with accept iff `score >= threshold`. Either way
    /// roughly the best `p` fraction is accepted.
    #[must_use]
    pub fn threshold(&self, p: f64, direction: Direction) -> Option<f64> {
        quantile_threshold(&self.scores(), p, direction)
    }

    /// One boolean per record, `true` = accepted under the threshold.
    #[must_use]
    pub fn labels(&self, threshold: f64, direction: Direction) -> Vec<bool> {
        self.records
            .iter()
            .map(|r| direction.accepts(r.score, threshold))
            .collect()
    }

    /// Writes the dataset as CSV: header = parameter names + `score`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if writing fails.
    pub fn write_csv(&self, mut writer: impl Write, space: &SearchSpace) -> io::Result<()> {
        for name in space.names() {
            write!(writer, "{},", csv_escape(name))?;
        }
        writeln!(writer, "score")?;

        for record in &self.records {
            for (_, value) in record.sample.iter() {
                write!(writer, "{},", csv_escape(&value.to_string()))?;
            }
            writeln!(writer, "{}", record.score)?;
        }
        Ok(())
    }

    /// Reads a dataset written by [`write_csv`](Self::write_csv), validating
    /// every row against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] if the header or any row conflicts
    /// with the parameter schema, or [`Error::Persistence`] on I/O failure.
    pub fn read_csv(reader: impl BufRead, space: &SearchSpace) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines
            .next()
            .transpose()
            .map_err(|e| Error::Persistence(e.to_string()))?
            .ok_or_else(|| Error::SchemaMismatch("dataset has no header row".into()))?;
        let mut expected: Vec<String> = space.names().map(str::to_owned).collect();
        expected.push("score".into());
        let got = split_csv_line(&header);
        if got != expected {
            return Err(Error::SchemaMismatch(format!(
                "dataset header {got:?} does not match schema {expected:?}"
            )));
        }

        let mut records = Vec::new();
        for (row, line) in lines.enumerate() {
            let line = line.map_err(|e| Error::Persistence(e.to_string()))?;
            if line.is_empty() {
                continue;
            }
            let fields = split_csv_line(&line);
            if fields.len() != space.len() + 1 {
                return Err(Error::SchemaMismatch(format!(
                    "row {row} has {} fields, expected {}",
                    fields.len(),
                    space.len() + 1
                )));
            }

            let mut entries = Vec::with_capacity(space.len());
            for (param, field) in space.params().iter().zip(&fields) {
                entries.push((param.name().to_owned(), parse_value(param, field, row)?));
            }
            let score: f64 = fields[space.len()].parse().map_err(|_| {
                Error::SchemaMismatch(format!(
                    "row {row} has non-numeric score '{}'",
                    fields[space.len()]
                ))
            })?;
            records.push(Record {
                sample: Sample::new(entries),
                score,
            });
        }
        Ok(Self { records })
    }
}

/// Parses one CSV field according to the declared parameter kind.
fn parse_value(param: &Parameter, field: &str, row: usize) -> Result<ParamValue> {
    let mismatch = || {
        Error::SchemaMismatch(format!(
            "row {row}: '{field}' is not valid for parameter '{}'",
            param.name()
        ))
    };
    let value = match param {
        Parameter::Discrete { values, .. } => match values[0].kind() {
            ValueKind::Int => ParamValue::Int(field.parse().map_err(|_| mismatch())?),
            ValueKind::Float => ParamValue::Float(field.parse().map_err(|_| mismatch())?),
            ValueKind::Str => ParamValue::Str(field.to_owned()),
        },
        Parameter::Uniform { .. } | Parameter::Normal { .. } => {
            ParamValue::Float(field.parse().map_err(|_| mismatch())?)
        }
    };
    // Discrete rows must name a declared value.
    if let Parameter::Discrete { values, .. } = param
        && !values.contains(&value)
    {
        return Err(mismatch());
    }
    Ok(value)
}

/// The acceptance threshold at quantile `p` for a batch of scores.
///
/// Scores are ranked best-first for `direction`; the threshold is the score
/// at rank `ceil(p * n)`, so with distinct scores the accepted count is
/// within one of `p * n`. When ties push the quantile onto the worst score
/// the threshold would accept the whole batch, which defeats the halving
/// split; in that case it steps to the nearest strictly better score (a
/// fully tied batch stays accept-all and is skipped downstream). Returns
/// `None` for an empty batch.
#[must_use]
#[allow(clippy::float_cmp)]
pub(crate) fn quantile_threshold(scores: &[f64], p: f64, direction: Direction) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
    if direction == Direction::Maximize {
        sorted.reverse();
    }
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let k = ((p * sorted.len() as f64).ceil() as usize).max(1) - 1;
    let threshold = sorted[k.min(sorted.len() - 1)];

    let worst = sorted[sorted.len() - 1];
    if threshold == worst
        && let Some(&better) = sorted.iter().rev().find(|&&v| v != worst)
    {
        return Some(better);
    }
    Some(threshold)
}

/// Label-stratified k-fold partition of `0..labels.len()`.
///
/// Indices of each class are shuffled with the given seed and dealt
/// round-robin into `k` folds; fold `i` is the validation set of split `i`.
/// Folds therefore preserve the class ratio up to rounding.
#[must_use]
pub fn stratified_kfold(labels: &[bool], k: usize, seed: u64) -> Vec<(Vec<usize>, Vec<usize>)> {
    assert!(k >= 2, "k-fold requires k >= 2, got {k}");

    let mut rng = fastrand::Rng::with_seed(seed);
    let mut positive: Vec<usize> = (0..labels.len()).filter(|&i| labels[i]).collect();
    let mut negative: Vec<usize> = (0..labels.len()).filter(|&i| !labels[i]).collect();
    rng.shuffle(&mut positive);
    rng.shuffle(&mut negative);

    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, &idx) in positive.iter().chain(negative.iter()).enumerate() {
        folds[i % k].push(idx);
    }

    (0..k)
        .map(|i| {
            let mut val = folds[i].clone();
            let mut train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            val.sort_unstable();
            train.sort_unstable();
            (train, val)
        })
        .collect()
}

/// Quote a CSV field if it contains a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Split one CSV line into fields, undoing [`csv_escape`].
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(core::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
